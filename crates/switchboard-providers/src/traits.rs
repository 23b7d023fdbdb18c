//! Provider trait: the capability contract every backend implements.
//!
//! Concrete backends own everything network-shaped (HTTP transport, auth,
//! transport-level retries). The router only needs the four operations below.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use switchboard_core::types::{GenerationRequest, GenerationResponse, ProviderId};
use tracing::debug;

use crate::error::ProviderError;
use crate::pricing::estimate_cost_from_pricing;

/// Prompt used by [`default_health_check`].
pub const HEALTH_CHECK_PROMPT: &str = "Say OK";

/// Trait that all providers must implement.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identity of this backend; unique within a router.
    fn id(&self) -> ProviderId;

    /// Model this provider instance targets.
    fn model(&self) -> &str;

    /// Run one generation.
    ///
    /// Implementations measure `response_time` and compute `cost` themselves.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Side-effect-free cost projection for `request`.
    ///
    /// Defaults to the static pricing table; fails for providers without
    /// pricing data.
    fn estimate_cost(&self, request: &GenerationRequest) -> Result<f64, ProviderError> {
        estimate_cost_from_pricing(self.id(), request)
    }

    /// Whether credentials/config look usable, without a full generation.
    async fn validate_config(&self) -> bool;

    /// One minimal real generation to probe the backend.
    async fn health_check(&self) -> HealthReport {
        default_health_check(self).await
    }
}

// ─────────────────────────────────────────────
// Health checks
// ─────────────────────────────────────────────

/// Outcome of a health probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of a single health check.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    pub provider: ProviderId,
    pub status: HealthStatus,
    pub latency: Duration,
    pub tokens_used: u32,
    pub cost: f64,
    /// Failure description when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    /// A failed probe with no usage.
    pub fn unhealthy(provider: ProviderId, latency: Duration, error: impl Into<String>) -> Self {
        Self {
            provider,
            status: HealthStatus::Unhealthy,
            latency,
            tokens_used: 0,
            cost: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Probe a provider with a tiny "say OK" generation.
///
/// Any provider gets this through the default [`Provider::health_check`];
/// implementations with a cheaper probe (a models list endpoint, say) can
/// override it.
pub async fn default_health_check<P: Provider + ?Sized>(provider: &P) -> HealthReport {
    let request = GenerationRequest::new(HEALTH_CHECK_PROMPT)
        .with_max_tokens(5)
        .with_temperature(0.0);

    let start = Instant::now();
    let result = provider.generate(&request).await;
    let latency = start.elapsed();

    match result {
        Ok(response) => {
            debug!(provider = %provider.id(), latency_ms = latency.as_millis() as u64, "health check ok");
            HealthReport {
                provider: provider.id(),
                status: HealthStatus::Healthy,
                latency,
                tokens_used: response.usage.total_tokens,
                cost: response.cost,
                error: None,
            }
        }
        Err(e) => {
            debug!(provider = %provider.id(), error = %e, "health check failed");
            HealthReport::unhealthy(provider.id(), latency, e.to_string())
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! Mock provider: a scriptable in-process backend.
//!
//! Used by router tests and by the CLI `simulate` command. Outcomes come
//! from, in order: queued one-shot outcomes, a sticky failure mode, then a
//! random failure rate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use switchboard_core::types::{GenerationRequest, GenerationResponse, ProviderId, TokenUsage};

use crate::error::{ProviderError, ProviderErrorKind};
use crate::pricing::{cost_for_usage, estimate_cost_from_pricing, find_pricing};
use crate::traits::Provider;

/// A provider whose behaviour is fully controlled by the caller.
pub struct MockProvider {
    id: ProviderId,
    model: String,
    latency: Duration,
    usage: TokenUsage,
    /// Fixed price used for both estimates and billing.
    fixed_cost: Option<f64>,
    pricing_available: bool,
    valid_config: bool,
    failure_rate: f64,
    failing: Mutex<Option<ProviderErrorKind>>,
    /// One-shot outcomes consumed before anything else (`None` = succeed).
    script: Mutex<VecDeque<Option<ProviderErrorKind>>>,
    calls: AtomicU32,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockProvider {
    /// A mock that always succeeds instantly.
    pub fn new(id: ProviderId) -> Self {
        let model = find_pricing(id)
            .map(|spec| spec.default_model.to_string())
            .unwrap_or_else(|| format!("{id}-mock"));
        Self {
            id,
            model,
            latency: Duration::ZERO,
            usage: TokenUsage::new(10, 20),
            fixed_cost: None,
            pricing_available: true,
            valid_config: true,
            failure_rate: 0.0,
            failing: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Simulated network latency per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Fixed cost per call, returned by both `estimate_cost` and responses.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.fixed_cost = Some(cost);
        self
    }

    /// Make `estimate_cost` fail, as if the price sheet were unreachable.
    pub fn without_pricing(mut self) -> Self {
        self.pricing_available = false;
        self
    }

    pub fn with_invalid_config(mut self) -> Self {
        self.valid_config = false;
        self
    }

    /// Fail randomly with a backend error at this rate (clamped to [0, 1]).
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Fail every call with `kind` until [`set_failing`](Self::set_failing) clears it.
    pub fn failing(self, kind: ProviderErrorKind) -> Self {
        self.set_failing(Some(kind));
        self
    }

    pub fn set_failing(&self, kind: Option<ProviderErrorKind>) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = kind;
    }

    /// Queue a one-shot failure for the next unscripted call.
    pub fn queue_failure(&self, kind: ProviderErrorKind) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Some(kind));
    }

    /// Queue a one-shot success (overrides the sticky failure mode once).
    pub fn queue_success(&self) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(None);
    }

    /// Number of `generate` calls so far (health checks included).
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_outcome(&self) -> Option<ProviderErrorKind> {
        if let Some(scripted) = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return scripted;
        }
        if let Some(kind) = *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Some(kind);
        }
        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            return Some(ProviderErrorKind::Backend);
        }
        None
    }

    fn billed_cost(&self) -> f64 {
        match self.fixed_cost {
            Some(cost) => cost,
            None => cost_for_usage(self.id, &self.usage).unwrap_or(0.0),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let start = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(kind) = self.next_outcome() {
            return Err(ProviderError::new(self.id, kind, "mock failure"));
        }

        Ok(GenerationResponse {
            content: format!("mock response from {}", self.id),
            provider: self.id,
            model: self.model.clone(),
            usage: self.usage,
            response_time: start.elapsed(),
            cost: self.billed_cost(),
            metadata: Default::default(),
        })
    }

    fn estimate_cost(&self, request: &GenerationRequest) -> Result<f64, ProviderError> {
        if !self.pricing_available {
            return Err(ProviderError::new(
                self.id,
                ProviderErrorKind::Pricing,
                "mock pricing unavailable",
            ));
        }
        match self.fixed_cost {
            Some(cost) => Ok(cost),
            None => estimate_cost_from_pricing(self.id, request),
        }
    }

    async fn validate_config(&self) -> bool {
        self.valid_config
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeeds_by_default() {
        let provider = MockProvider::new(ProviderId::OpenAi);
        let resp = provider.generate(&GenerationRequest::new("hi")).await.unwrap();

        assert_eq!(resp.provider, ProviderId::OpenAi);
        assert_eq!(resp.model, "gpt-4o-mini");
        assert_eq!(resp.usage.total_tokens, 30);
        assert!(resp.cost > 0.0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_mode_is_sticky() {
        let provider = MockProvider::new(ProviderId::Groq).failing(ProviderErrorKind::RateLimit);
        let req = GenerationRequest::new("hi");

        for _ in 0..3 {
            let err = provider.generate(&req).await.unwrap_err();
            assert_eq!(err.kind, ProviderErrorKind::RateLimit);
            assert_eq!(err.provider, ProviderId::Groq);
        }

        provider.set_failing(None);
        assert!(provider.generate(&req).await.is_ok());
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_script_runs_before_sticky_mode() {
        let provider = MockProvider::new(ProviderId::Gemini).failing(ProviderErrorKind::Backend);
        provider.queue_success();
        provider.queue_failure(ProviderErrorKind::Quota);
        let req = GenerationRequest::new("hi");

        assert!(provider.generate(&req).await.is_ok());
        assert_eq!(provider.generate(&req).await.unwrap_err().kind, ProviderErrorKind::Quota);
        assert_eq!(provider.generate(&req).await.unwrap_err().kind, ProviderErrorKind::Backend);
    }

    #[tokio::test]
    async fn test_failure_rate_one_always_fails() {
        let provider = MockProvider::new(ProviderId::Mistral).with_failure_rate(1.0);
        let err = provider.generate(&GenerationRequest::new("hi")).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Backend);
    }

    #[tokio::test]
    async fn test_latency_is_reported() {
        let provider = MockProvider::new(ProviderId::Ollama).with_latency(Duration::from_millis(20));
        let resp = provider.generate(&GenerationRequest::new("hi")).await.unwrap();
        assert!(resp.response_time >= Duration::from_millis(20));
        assert_eq!(resp.cost, 0.0);
    }

    #[test]
    fn test_fixed_cost_estimate() {
        let provider = MockProvider::new(ProviderId::Anthropic).with_cost(0.01);
        assert_eq!(provider.estimate_cost(&GenerationRequest::new("hi")).unwrap(), 0.01);
    }

    #[test]
    fn test_without_pricing_estimate_fails() {
        let provider = MockProvider::new(ProviderId::Anthropic).without_pricing();
        let err = provider.estimate_cost(&GenerationRequest::new("hi")).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Pricing);
    }

    #[test]
    fn test_model_for_unpriced_provider() {
        assert_eq!(MockProvider::new(ProviderId::OpenRouter).model(), "openrouter-mock");
    }

    #[tokio::test]
    async fn test_validate_config() {
        assert!(MockProvider::new(ProviderId::Groq).validate_config().await);
        assert!(!MockProvider::new(ProviderId::Groq).with_invalid_config().validate_config().await);
    }
}

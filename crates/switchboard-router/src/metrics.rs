//! Per-provider rolling statistics.
//!
//! One `ProviderMetrics` exists per registered provider and is owned by the
//! router. It has no interior locking; the router serializes access.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use switchboard_core::config::ProviderSettings;
use switchboard_core::types::{GenerationResponse, ProviderId};
use switchboard_providers::ProviderError;

/// Weight of the newest sample in the response-time moving average.
pub const SMOOTHING_FACTOR: f64 = 0.1;

/// Samples kept in each recent-history buffer.
pub const RECENT_SAMPLES: usize = 10;

/// Live statistical summary for exactly one provider.
///
/// Invariant: `successful_requests + failed_requests == total_requests`.
#[derive(Clone, Debug)]
pub struct ProviderMetrics {
    pub provider: ProviderId,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Accumulated cost in USD.
    pub total_cost: f64,
    pub total_tokens: u64,
    /// Exponentially smoothed response time, in seconds.
    pub avg_response_time: f64,
    /// Last [`RECENT_SAMPLES`] response times (seconds), oldest first.
    pub recent_response_times: VecDeque<f64>,
    /// Last [`RECENT_SAMPLES`] costs, oldest first.
    pub recent_costs: VecDeque<f64>,
    /// Historical output quality in [0, 1].
    pub quality_score: f64,
    pub weight: f64,
    /// Lower = preferred.
    pub priority: i32,
    /// Gate for selection; false while quarantined.
    pub is_available: bool,
    /// Failures since the last window reset.
    pub error_count_window: u32,
    pub last_used: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl ProviderMetrics {
    pub fn new(provider: ProviderId) -> Self {
        Self::with_settings(provider, &ProviderSettings::default())
    }

    /// Fresh metrics seeded with configured priority, weight and quality.
    pub fn with_settings(provider: ProviderId, settings: &ProviderSettings) -> Self {
        Self {
            provider,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_cost: 0.0,
            total_tokens: 0,
            avg_response_time: 0.0,
            recent_response_times: VecDeque::with_capacity(RECENT_SAMPLES),
            recent_costs: VecDeque::with_capacity(RECENT_SAMPLES),
            quality_score: settings.quality_score.clamp(0.0, 1.0),
            weight: settings.weight.max(0.0),
            priority: settings.priority,
            is_available: true,
            error_count_window: 0,
            last_used: None,
            last_error: None,
            last_error_at: None,
        }
    }

    /// Record the outcome of one call.
    ///
    /// On failure only the counters move: pass a zero-valued
    /// [`GenerationResponse::placeholder`], its billing fields are ignored.
    pub fn record(&mut self, response: &GenerationResponse, success: bool) {
        self.total_requests += 1;
        self.last_used = Some(Utc::now());

        if !success {
            self.failed_requests += 1;
            self.error_count_window += 1;
            return;
        }

        let sample = response.response_time.as_secs_f64();
        self.avg_response_time = if self.successful_requests == 0 {
            sample
        } else {
            SMOOTHING_FACTOR * sample + (1.0 - SMOOTHING_FACTOR) * self.avg_response_time
        };

        self.successful_requests += 1;
        self.total_cost += response.cost;
        self.total_tokens += u64::from(response.usage.total_tokens);

        push_bounded(&mut self.recent_response_times, sample);
        push_bounded(&mut self.recent_costs, response.cost);
    }

    /// Remember the most recent failure for diagnostics.
    pub fn record_error(&mut self, error: &ProviderError) {
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(Utc::now());
    }

    /// Start a new error window. Availability is left as is.
    pub fn reset_window(&mut self) {
        self.error_count_window = 0;
    }

    /// Fraction of successful calls; 1.0 before any call.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Historical cost per token; 0.0 before any tokens.
    pub fn avg_cost_per_token(&self) -> f64 {
        if self.total_tokens == 0 {
            0.0
        } else {
            self.total_cost / self.total_tokens as f64
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            provider: self.provider,
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            success_rate: self.success_rate(),
            total_cost: self.total_cost,
            total_tokens: self.total_tokens,
            avg_cost_per_token: self.avg_cost_per_token(),
            avg_response_time: self.avg_response_time,
            quality_score: self.quality_score,
            weight: self.weight,
            priority: self.priority,
            is_available: self.is_available,
            error_count_window: self.error_count_window,
            last_used: self.last_used,
            last_error: self.last_error.clone(),
            last_error_at: self.last_error_at,
        }
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64) {
    if buf.len() == RECENT_SAMPLES {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Read-only view of one provider's metrics, with derived values filled in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub provider: ProviderId,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub avg_cost_per_token: f64,
    pub avg_response_time: f64,
    pub quality_score: f64,
    pub weight: f64,
    pub priority: i32,
    pub is_available: bool,
    pub error_count_window: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use switchboard_core::types::TokenUsage;

    fn response(cost: f64, tokens: u32, millis: u64) -> GenerationResponse {
        GenerationResponse {
            cost,
            usage: TokenUsage::new(tokens / 2, tokens - tokens / 2),
            response_time: Duration::from_millis(millis),
            ..GenerationResponse::placeholder(ProviderId::OpenAi)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fresh_metrics_defaults() {
        let m = ProviderMetrics::new(ProviderId::OpenAi);
        assert_eq!(m.success_rate(), 1.0);
        assert_eq!(m.avg_cost_per_token(), 0.0);
        assert!(m.is_available);
        assert_eq!(m.error_count_window, 0);
        assert_eq!(m.priority, 1);
        assert_eq!(m.weight, 1.0);
    }

    #[test]
    fn test_successes_accumulate() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(0.01, 100, 500), true);
        m.record(&response(0.02, 50, 500), true);
        m.record(&response(0.005, 10, 500), true);

        assert_eq!(m.total_requests, 3);
        assert_eq!(m.successful_requests, 3);
        assert_eq!(m.failed_requests, 0);
        assert!(approx(m.total_cost, 0.035));
        assert_eq!(m.total_tokens, 160);
        assert!(approx(m.avg_cost_per_token(), 0.035 / 160.0));
    }

    #[test]
    fn test_first_sample_initializes_average() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(0.0, 10, 1500), true);
        assert_eq!(m.avg_response_time, 1.5);
    }

    #[test]
    fn test_average_is_exponentially_smoothed() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(0.0, 10, 1000), true);
        m.record(&response(0.0, 10, 2000), true);
        // 0.1 * 2.0 + 0.9 * 1.0
        assert!(approx(m.avg_response_time, 1.1));
    }

    #[test]
    fn test_failures_only_touch_counters() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(0.01, 100, 800), true);
        let (cost, tokens, avg) = (m.total_cost, m.total_tokens, m.avg_response_time);

        for i in 1..=4 {
            m.record(&GenerationResponse::placeholder(ProviderId::OpenAi), false);
            assert_eq!(m.failed_requests, i);
            assert_eq!(m.error_count_window, i as u32);
        }

        assert_eq!(m.total_cost, cost);
        assert_eq!(m.total_tokens, tokens);
        assert_eq!(m.avg_response_time, avg);
        assert_eq!(m.recent_costs.len(), 1);
        assert_eq!(m.successful_requests + m.failed_requests, m.total_requests);
        assert!(approx(m.success_rate(), 0.2));
    }

    #[test]
    fn test_failure_ignores_billing_fields() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(5.0, 1000, 100), false);
        assert_eq!(m.total_cost, 0.0);
        assert_eq!(m.total_tokens, 0);
        assert_eq!(m.avg_response_time, 0.0);
    }

    #[test]
    fn test_recent_samples_are_bounded() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        for i in 0..15u64 {
            m.record(&response(i as f64, 10, i * 100), true);
        }
        assert_eq!(m.recent_costs.len(), RECENT_SAMPLES);
        assert_eq!(m.recent_response_times.len(), RECENT_SAMPLES);
        // Oldest five evicted
        assert_eq!(m.recent_costs.front(), Some(&5.0));
        assert_eq!(m.recent_costs.back(), Some(&14.0));
    }

    #[test]
    fn test_reset_window_keeps_availability() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.error_count_window = 3;
        m.is_available = false;
        m.reset_window();
        assert_eq!(m.error_count_window, 0);
        assert!(!m.is_available);
    }

    #[test]
    fn test_record_error_keeps_message() {
        let mut m = ProviderMetrics::new(ProviderId::Groq);
        m.record_error(&ProviderError::rate_limit(ProviderId::Groq, "429"));
        assert_eq!(m.last_error.as_deref(), Some("groq: rate limited: 429"));
        assert!(m.last_error_at.is_some());
    }

    #[test]
    fn test_with_settings() {
        let settings = ProviderSettings {
            priority: 4,
            weight: 2.5,
            quality_score: 0.95,
            enabled: true,
        };
        let m = ProviderMetrics::with_settings(ProviderId::Anthropic, &settings);
        assert_eq!(m.priority, 4);
        assert_eq!(m.weight, 2.5);
        assert_eq!(m.quality_score, 0.95);
    }

    #[test]
    fn test_snapshot_includes_derived_values() {
        let mut m = ProviderMetrics::new(ProviderId::OpenAi);
        m.record(&response(0.02, 100, 200), true);
        m.record(&GenerationResponse::placeholder(ProviderId::OpenAi), false);

        let snap = m.snapshot();
        assert_eq!(snap.success_rate, 0.5);
        assert!(approx(snap.avg_cost_per_token, 0.0002));
        assert_eq!(snap.error_count_window, 1);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["provider"], "openai");
        assert!(json.get("last_error").is_none());
    }
}

//! Pricing table: static per-token prices for the supported providers.
//!
//! Each `PricingSpec` describes what one provider's default model costs.
//! Cost-aware routing uses [`estimate_cost_from_pricing`] to project the price
//! of a request before it is sent; providers use [`cost_for_usage`] to bill a
//! finished response.
//!
//! OpenRouter is intentionally absent: its price depends on the model it
//! forwards to, so estimates for it fail and callers fall back to history.

use switchboard_core::types::{GenerationRequest, ProviderId, TokenUsage};

use crate::error::{ProviderError, ProviderErrorKind};

// ─────────────────────────────────────────────
// PricingSpec: static prices for one provider
// ─────────────────────────────────────────────

/// Static price sheet for one provider's default model.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingSpec {
    pub provider: ProviderId,
    /// Model the prices apply to.
    pub default_model: &'static str,
    /// USD per 1K prompt tokens.
    pub input_per_1k: f64,
    /// USD per 1K completion tokens.
    pub output_per_1k: f64,
}

impl PricingSpec {
    /// Price of `prompt_tokens` in and `completion_tokens` out.
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.input_per_1k
            + (completion_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Known prices, one entry per billable provider.
pub static PRICING: &[PricingSpec] = &[
    PricingSpec {
        provider: ProviderId::OpenAi,
        default_model: "gpt-4o-mini",
        input_per_1k: 0.000_15,
        output_per_1k: 0.000_6,
    },
    PricingSpec {
        provider: ProviderId::Anthropic,
        default_model: "claude-3-5-haiku-latest",
        input_per_1k: 0.000_8,
        output_per_1k: 0.004,
    },
    PricingSpec {
        provider: ProviderId::Gemini,
        default_model: "gemini-1.5-flash",
        input_per_1k: 0.000_075,
        output_per_1k: 0.000_3,
    },
    PricingSpec {
        provider: ProviderId::Groq,
        default_model: "llama-3.1-8b-instant",
        input_per_1k: 0.000_05,
        output_per_1k: 0.000_08,
    },
    PricingSpec {
        provider: ProviderId::DeepSeek,
        default_model: "deepseek-chat",
        input_per_1k: 0.000_27,
        output_per_1k: 0.001_1,
    },
    PricingSpec {
        provider: ProviderId::Mistral,
        default_model: "mistral-small-latest",
        input_per_1k: 0.000_2,
        output_per_1k: 0.000_6,
    },
    // Local: free
    PricingSpec {
        provider: ProviderId::Ollama,
        default_model: "llama3.1",
        input_per_1k: 0.0,
        output_per_1k: 0.0,
    },
];

// ─────────────────────────────────────────────
// Lookup and cost functions
// ─────────────────────────────────────────────

/// Find the price sheet for a provider.
pub fn find_pricing(provider: ProviderId) -> Option<&'static PricingSpec> {
    PRICING.iter().find(|spec| spec.provider == provider)
}

fn pricing_or_err(provider: ProviderId) -> Result<&'static PricingSpec, ProviderError> {
    find_pricing(provider).ok_or_else(|| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Pricing,
            "no pricing data for provider",
        )
    })
}

/// Project the cost of a request before sending it.
///
/// Assumes the full `max_tokens` completion budget is used, so this is an
/// upper-bound style estimate rather than an exact price.
pub fn estimate_cost_from_pricing(
    provider: ProviderId,
    request: &GenerationRequest,
) -> Result<f64, ProviderError> {
    let spec = pricing_or_err(provider)?;
    Ok(spec.cost(request.estimated_prompt_tokens(), request.max_tokens))
}

/// Exact cost of a finished call, from the usage the provider reported.
pub fn cost_for_usage(provider: ProviderId, usage: &TokenUsage) -> Result<f64, ProviderError> {
    let spec = pricing_or_err(provider)?;
    Ok(spec.cost(usage.prompt_tokens, usage.completion_tokens))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

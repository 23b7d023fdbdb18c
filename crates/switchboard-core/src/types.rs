//! Core types for Switchboard: provider identity and the request/response
//! pair that flows between the router and every provider.
//!
//! A [`GenerationRequest`] is owned by the caller and never mutated once it
//! has been submitted. A [`GenerationResponse`] is produced by a provider,
//! read once by the router to update metrics, then handed back to the caller.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Provider identity
// ─────────────────────────────────────────────

/// Identity of a backend provider.
///
/// Stable and comparable, so it doubles as a map key in the registry and in
/// the on-disk config (serialized lowercase, e.g. `OpenAi` → `"openai"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
    Groq,
    DeepSeek,
    Mistral,
    OpenRouter,
    /// Self-hosted models served through Ollama.
    Ollama,
}

impl ProviderId {
    /// Every known provider, in declaration order.
    pub const ALL: [ProviderId; 8] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Gemini,
        ProviderId::Groq,
        ProviderId::DeepSeek,
        ProviderId::Mistral,
        ProviderId::OpenRouter,
        ProviderId::Ollama,
    ];

    /// Internal name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Gemini => "gemini",
            ProviderId::Groq => "groq",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Mistral => "mistral",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Ollama => "ollama",
        }
    }

    /// Human-readable name for logs and the CLI.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Anthropic",
            ProviderId::Gemini => "Gemini",
            ProviderId::Groq => "Groq",
            ProviderId::DeepSeek => "DeepSeek",
            ProviderId::Mistral => "Mistral",
            ProviderId::OpenRouter => "OpenRouter",
            ProviderId::Ollama => "Ollama",
        }
    }

    /// Whether the provider runs locally (no per-token billing).
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderId::Ollama)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ProviderId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or(UnknownProvider(s.to_string()))
    }
}

// ─────────────────────────────────────────────
// Generation request
// ─────────────────────────────────────────────

/// A single text generation request submitted to the router.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// The user prompt.
    pub prompt: String,
    /// Optional system prompt prepended by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Nucleus sampling cutoff (0.0 – 1.0).
    pub top_p: f64,
    /// Sequences that stop generation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Free-form caller metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GenerationRequest {
    /// Create a request with default sampling parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 1.0,
            stop: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Rough prompt size in tokens (≈ 4 characters per token).
    ///
    /// Good enough for cost projections; providers report exact counts.
    pub fn estimated_prompt_tokens(&self) -> u32 {
        let chars = self.prompt.chars().count()
            + self
                .system_prompt
                .as_deref()
                .map_or(0, |s| s.chars().count());
        (chars as u32).div_ceil(4)
    }
}

// ─────────────────────────────────────────────
// Generation response
// ─────────────────────────────────────────────

/// Token usage reported by a provider.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// The result of a successful generation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    /// Generated text.
    pub content: String,
    /// Provider that produced the response.
    pub provider: ProviderId,
    /// Model identifier used by the provider.
    pub model: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Wall-clock time of the provider call.
    pub response_time: Duration,
    /// Computed cost in USD.
    pub cost: f64,
    /// Free-form provider metadata (finish reason, request id, …).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GenerationResponse {
    /// Zero-valued response recorded for failed calls.
    ///
    /// Only the request counters move when this is recorded; cost, tokens and
    /// timing stay untouched.
    pub fn placeholder(provider: ProviderId) -> Self {
        Self {
            content: String::new(),
            provider,
            model: String::new(),
            usage: TokenUsage::default(),
            response_time: Duration::ZERO,
            cost: 0.0,
            metadata: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

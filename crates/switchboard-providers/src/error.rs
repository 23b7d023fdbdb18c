//! Provider failure taxonomy.

use std::fmt;

use switchboard_core::types::ProviderId;

/// What went wrong inside a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Generic backend failure (5xx, malformed response, …).
    Backend,
    /// Too many requests; usually clears after a backoff.
    RateLimit,
    /// Account quota or credit exhausted.
    Quota,
    /// Credentials rejected.
    Authentication,
    /// Connection refused, DNS, TLS, reset.
    Transport,
    /// The call did not finish in time.
    Timeout,
    /// No pricing data for cost estimation.
    Pricing,
}

impl ProviderErrorKind {
    /// Whether another call to the *same* provider could plausibly succeed.
    ///
    /// Auth and quota failures will keep failing until someone intervenes.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ProviderErrorKind::Authentication | ProviderErrorKind::Quota | ProviderErrorKind::Pricing
        )
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::Backend => "backend error",
            ProviderErrorKind::RateLimit => "rate limited",
            ProviderErrorKind::Quota => "quota exceeded",
            ProviderErrorKind::Authentication => "authentication failed",
            ProviderErrorKind::Transport => "transport error",
            ProviderErrorKind::Timeout => "timed out",
            ProviderErrorKind::Pricing => "pricing unavailable",
        };
        f.write_str(s)
    }
}

/// Error raised by a [`Provider`](crate::Provider) operation.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {kind}: {message}")]
pub struct ProviderError {
    /// Provider that failed.
    pub provider: ProviderId,
    pub kind: ProviderErrorKind,
    pub message: String,
    /// Underlying cause, if any (HTTP client error, parse error, …).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ProviderError {
    pub fn new(provider: ProviderId, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn backend(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Backend, message)
    }

    pub fn rate_limit(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::RateLimit, message)
    }

    pub fn quota(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Quota, message)
    }

    pub fn authentication(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Authentication, message)
    }

    pub fn transport(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Transport, message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

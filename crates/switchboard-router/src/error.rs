//! Errors surfaced by the router.

use switchboard_providers::ProviderError;

/// Why the router could not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// No registered provider is currently selectable.
    #[error("no providers available")]
    NoProvidersAvailable,

    /// Every attempt in the retry budget failed.
    #[error("all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ProviderError,
    },
}

impl RouterError {
    /// The final provider failure, if any attempt was made.
    pub fn last_provider_error(&self) -> Option<&ProviderError> {
        match self {
            RouterError::NoProvidersAvailable => None,
            RouterError::RetriesExhausted { last, .. } => Some(last),
        }
    }
}

//! Provider call errors.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by a [`Provider`](crate::Provider) call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Collection failed: {0}")]
    CallFailed(String),

    #[error("Malformed provider result: {0}")]
    Malformed(String),

    #[error("Operation not supported by provider {0}")]
    Unsupported(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider call cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Whether the failure came from the process boundary rather than the check.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport(_) | ProviderError::Timeout(_) | ProviderError::Cancelled
        )
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

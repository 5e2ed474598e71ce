//! Component invocation errors.

use thiserror::Error;

use super::ProviderError;

/// Errors raised while invoking a component's entry point.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Component {0} panicked")]
    Panicked(String),

    #[error("Component {0} is not available on this host")]
    NotApplicable(String),

    #[error("{0}")]
    Custom(String),
}

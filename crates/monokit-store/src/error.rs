//! Store errors.

use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database could not be opened.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A read or write failed.
    #[error("Store query error: {0}")]
    Query(String),

    /// A stored value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

//! Alarm errors.

use thiserror::Error;

use monokit_store::StoreError;

/// Alarm error types. None of them block a state transition.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// Alert delivery failed.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Issue tracker request failed.
    #[error("Issue tracker error: {0}")]
    Tracker(String),

    /// Alarm state could not be read or written.
    #[error("Alarm store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

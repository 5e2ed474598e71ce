//! Daemon-related errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during daemon operations.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Another live process holds the lock file.
    #[error("Already running (lock file: {path}, PID: {pid})")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    /// Failed to create lock file.
    #[error("Failed to create lock file at {path}: {reason}")]
    LockFileCreation { path: PathBuf, reason: String },

    /// Failed to read lock file.
    #[error("Failed to read lock file at {path}: {reason}")]
    LockFileRead { path: PathBuf, reason: String },

    /// Failed to remove lock file.
    #[error("Failed to remove lock file at {path}: {reason}")]
    LockFileRemoval { path: PathBuf, reason: String },

    /// Failed to set up signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

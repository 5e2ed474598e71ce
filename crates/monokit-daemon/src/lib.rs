//! # Monokit Daemon
//!
//! Runs registered components once or on a fixed interval.
//!
//! ## Features
//!
//! - Sequential batch scheduler with per-component failure isolation
//! - Signal handling (SIGTERM/SIGINT for shutdown, SIGHUP for plugin reload)
//! - Per-command lock files with stale PID detection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monokit_daemon::{Scheduler, SignalHandler};
//!
//! let scheduler = Scheduler::new(registry, hostname);
//! let signals = SignalHandler::new();
//! signals.setup_os_signals().await?;
//! scheduler.run_forever(Duration::from_secs(60), &signals).await;
//! ```

pub mod error;
pub mod lockfile;
pub mod scheduler;
pub mod signal;

pub use error::DaemonError;
pub use lockfile::LockFile;
pub use scheduler::{BatchReport, CycleContext, CycleHook, Scheduler};
pub use signal::{DaemonSignal, SignalHandler};

//! # Monokit Alarm
//!
//! Turns per-key up/down observations into deduplicated notifications and
//! keeps an issue tracker ticket in sync with observed health.
//!
//! ## Features
//!
//! - Per-key state machine (Unknown, Up, Down) persisted in a [`KvStore`](monokit_store::KvStore)
//! - Re-notification suppression while a key stays down
//! - Webhook (Slack or plain JSON) and log alert channels
//! - Redmine issue tracker synchronization

pub mod alert_channels;
pub mod alert_manager;
pub mod alerts;
pub mod config;
pub mod engine;
pub mod error;
pub mod redmine;
pub mod state;
pub mod tracker;

pub use alert_channels::WebhookChannel;
pub use alert_manager::AlertManager;
pub use alerts::{Alert, AlertChannel, AlertKind, LogChannel};
pub use config::{AlarmConfig, TrackerConfig, WebhookFormat};
pub use engine::{AlarmEngine, AlarmOutcome};
pub use error::AlarmError;
pub use redmine::RedmineTracker;
pub use state::{ALARM_NAMESPACE, AlarmState, AlarmStore, HealthState};
pub use tracker::{IssueRef, IssueTracker};

//! Alarm notifications and the channel trait that delivers them.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::AlarmError;

/// Which alarm event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The key went down.
    Down,
    /// The key is still down and the re-notification interval elapsed.
    StillDown,
    /// The key came back up.
    Recovered,
}

impl AlertKind {
    pub fn is_down(&self) -> bool {
        !matches!(self, AlertKind::Recovered)
    }

    pub fn emoji(&self) -> &'static str {
        if self.is_down() { "\u{274c}" } else { "\u{2705}" }
    }

    /// Slack attachment color.
    pub fn color(&self) -> &'static str {
        if self.is_down() { "#d9534f" } else { "#36a64f" }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Down => write!(f, "DOWN"),
            AlertKind::StillDown => write!(f, "still DOWN"),
            AlertKind::Recovered => write!(f, "UP"),
        }
    }
}

/// One notification about an alarm key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub key: String,
    pub kind: AlertKind,
    /// Check output that triggered the alert.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub host: Option<String>,
    pub consecutive_failures: u32,
}

impl Alert {
    pub fn new(key: impl Into<String>, kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            host: None,
            consecutive_failures: 0,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_failures(mut self, consecutive_failures: u32) -> Self {
        self.consecutive_failures = consecutive_failures;
        self
    }

    /// `"<key> is DOWN"`, `"<key> is still DOWN"` or `"<key> is UP"`.
    pub fn title(&self) -> String {
        format!("{} is {}", self.key, self.kind)
    }

    /// Plain text rendering used by the plain webhook body and the log.
    pub fn format_text(&self) -> String {
        let mut text = format!(
            "{} {} at {}\n{}",
            self.kind.emoji(),
            self.title(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.message
        );
        if let Some(ref host) = self.host {
            text.push_str(&format!("\nHost: {}", host));
        }
        if self.kind.is_down() {
            text.push_str(&format!("\nConsecutive failures: {}", self.consecutive_failures));
        }
        text
    }
}

/// Alert channel trait.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Result<(), AlarmError>;
}

/// Writes alerts to the tracing log.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlarmError> {
        if alert.kind.is_down() {
            error!("[ALARM] {}: {}", alert.title(), alert.message);
        } else {
            info!("[ALARM] {}: {}", alert.title(), alert.message);
        }
        Ok(())
    }
}

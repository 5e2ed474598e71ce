//! Alarm configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

/// Body shape posted to the webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    /// Slack incoming-webhook attachments.
    #[default]
    Slack,
    /// `{"text": ...}` plus the raw alert.
    Plain,
}

/// Alarm engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Whether alerts are delivered to the webhook. Log delivery is always on.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum spacing between notifications for a key that stays down.
    #[serde(default = "default_renotify_interval")]
    pub renotify_interval_secs: u64,

    /// Send a recovery notification for a key first observed up.
    #[serde(default = "default_notify_initial_up")]
    pub notify_initial_up: bool,

    /// Chat webhook URL.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub webhook_format: WebhookFormat,

    /// Webhook request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

fn default_renotify_interval() -> u64 {
    3600
}

fn default_notify_initial_up() -> bool {
    true
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            renotify_interval_secs: default_renotify_interval(),
            notify_initial_up: default_notify_initial_up(),
            webhook_url: None,
            webhook_format: WebhookFormat::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AlarmConfig {
    pub fn renotify_interval(&self) -> Duration {
        Duration::from_secs(self.renotify_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_renotify_interval(mut self, interval: Duration) -> Self {
        self.renotify_interval_secs = interval.as_secs();
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>, format: WebhookFormat) -> Self {
        self.webhook_url = Some(url.into());
        self.webhook_format = format;
        self
    }

    pub fn with_notify_initial_up(mut self, notify: bool) -> Self {
        self.notify_initial_up = notify;
        self
    }

    /// Webhook URL when delivery is enabled and a non-empty URL is set.
    pub fn active_webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .filter(|url| self.enabled && !url.is_empty())
    }
}

/// Issue tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Tracker base URL, e.g. `https://redmine.example.com`.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    /// Project identifier issues are filed under.
    #[serde(default)]
    pub project_id: String,

    /// Custom field holding the service identity (the alarm key).
    #[serde(default)]
    pub service_field_id: u64,

    /// Status applied when closing an issue.
    #[serde(default = "default_closed_status")]
    pub closed_status_id: u64,

    /// Tracker request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_closed_status() -> u64 {
    5
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            service_field_id: 0,
            closed_status_id: default_closed_status(),
            timeout_secs: default_timeout(),
        }
    }
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), AlarmError> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AlarmError::InvalidConfig(format!(
                "tracker url must be http(s): {:?}",
                self.url
            )));
        }
        if self.project_id.is_empty() {
            return Err(AlarmError::InvalidConfig(
                "tracker project_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

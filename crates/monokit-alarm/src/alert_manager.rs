//! Alert manager for dispatching alerts to channels.

use tracing::{error, info};

use crate::config::AlarmConfig;
use crate::error::AlarmError;

use super::alert_channels::WebhookChannel;
use super::alerts::{Alert, AlertChannel, LogChannel};

/// Alert manager.
pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AlertManager {
    /// Create a manager that only logs.
    pub fn new() -> Self {
        Self {
            channels: vec![Box::new(LogChannel)],
        }
    }

    /// Create a manager without any channel.
    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Create from config.
    ///
    /// A webhook whose HTTP client cannot be built is skipped with an error log.
    pub fn from_config(config: &AlarmConfig) -> Self {
        let mut manager = Self::new();

        if let Some(webhook_url) = config.active_webhook() {
            match WebhookChannel::new(webhook_url, config.webhook_format, config.timeout()) {
                Ok(channel) => {
                    info!("Adding {:?} webhook alert channel", config.webhook_format);
                    manager.add_channel(Box::new(channel));
                }
                Err(e) => error!("Webhook alert channel disabled: {}", e),
            }
        }

        manager
    }

    /// Add a channel.
    pub fn add_channel(&mut self, channel: Box<dyn AlertChannel>) {
        self.channels.push(channel);
    }

    pub fn with_channel(mut self, channel: Box<dyn AlertChannel>) -> Self {
        self.add_channel(channel);
        self
    }

    /// Get list of channel names.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send an alert to all channels. Failures are logged and returned.
    pub async fn send(&self, alert: &Alert) -> Vec<AlarmError> {
        let mut errors = Vec::new();

        for channel in &self.channels {
            if let Err(e) = channel.send(alert).await {
                error!("Failed to send alert via {}: {}", channel.name(), e);
                errors.push(e);
            }
        }

        errors
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Webhook alert channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::WebhookFormat;
use crate::error::AlarmError;

use super::alerts::{Alert, AlertChannel};

/// Chat webhook channel.
pub struct WebhookChannel {
    webhook_url: String,
    format: WebhookFormat,
    client: Client,
}

impl WebhookChannel {
    /// Create a webhook channel whose requests give up after `timeout`.
    pub fn new(
        webhook_url: impl Into<String>,
        format: WebhookFormat,
        timeout: Duration,
    ) -> Result<Self, AlarmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlarmError::Notification(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            format,
            client,
        })
    }

    /// Body posted for `alert`.
    pub fn payload(&self, alert: &Alert) -> serde_json::Value {
        match self.format {
            WebhookFormat::Slack => {
                let mut fields = vec![serde_json::json!({
                    "title": "key",
                    "value": alert.key,
                    "short": true
                })];
                if alert.kind.is_down() {
                    fields.push(serde_json::json!({
                        "title": "consecutive failures",
                        "value": alert.consecutive_failures.to_string(),
                        "short": true
                    }));
                }
                serde_json::json!({
                    "attachments": [{
                        "color": alert.kind.color(),
                        "title": format!("{} {}", alert.kind.emoji(), alert.title()),
                        "text": alert.message,
                        "footer": alert.host.as_deref().unwrap_or("Monokit"),
                        "ts": alert.timestamp.timestamp(),
                        "fields": fields,
                    }]
                })
            }
            WebhookFormat::Plain => serde_json::json!({
                "text": alert.format_text(),
                "alert": alert,
            }),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlarmError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(alert))
            .send()
            .await
            .map_err(|e| AlarmError::Notification(format!("Webhook request failed: {}", e)))?;

        if response.status().is_success() {
            debug!("Webhook alert sent for '{}'", alert.key);
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AlarmError::Notification(format!(
                "Webhook returned {}: {}",
                status, body
            )))
        }
    }
}

//! Redmine issue tracker client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::error::AlarmError;
use crate::tracker::{IssueRef, IssueTracker};

#[cfg(test)]
#[path = "redmine_tests.rs"]
mod tests;

const API_KEY_HEADER: &str = "X-Redmine-API-Key";

#[derive(Debug, Deserialize)]
struct IssueList {
    #[serde(default)]
    issues: Vec<IssueRef>,
}

#[derive(Debug, Deserialize)]
struct IssueEnvelope {
    issue: IssueRef,
}

/// Redmine REST API tracker.
pub struct RedmineTracker {
    base_url: String,
    api_key: String,
    project_id: String,
    service_field_id: u64,
    closed_status_id: u64,
    client: Client,
}

impl RedmineTracker {
    /// Create a tracker client whose requests give up after `config.timeout()`.
    pub fn new(config: &TrackerConfig) -> Result<Self, AlarmError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AlarmError::Tracker(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            service_field_id: config.service_field_id,
            closed_status_id: config.closed_status_id,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, AlarmError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AlarmError::Tracker(format!("{} returned {}: {}", what, status, body)))
    }

    async fn update(
        &self,
        issue_id: u64,
        body: serde_json::Value,
        what: &str,
    ) -> Result<(), AlarmError> {
        let response = self
            .client
            .put(self.url(&format!("/issues/{}.json", issue_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AlarmError::Tracker(format!("{} request failed: {}", what, e)))?;
        Self::check(response, what).await?;
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for RedmineTracker {
    fn name(&self) -> &str {
        "redmine"
    }

    async fn find_open_issue(&self, service: &str) -> Result<Option<IssueRef>, AlarmError> {
        let field = format!("cf_{}", self.service_field_id);
        let response = self
            .client
            .get(self.url("/issues.json"))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("project_id", self.project_id.as_str()),
                ("status_id", "open"),
                (field.as_str(), service),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| AlarmError::Tracker(format!("Issue search failed: {}", e)))?;

        let list: IssueList = Self::check(response, "Issue search")
            .await?
            .json()
            .await
            .map_err(|e| AlarmError::Tracker(format!("Malformed issue list: {}", e)))?;

        Ok(list.issues.into_iter().next())
    }

    async fn create_issue(
        &self,
        service: &str,
        subject: &str,
        description: &str,
    ) -> Result<IssueRef, AlarmError> {
        let body = serde_json::json!({
            "issue": {
                "project_id": self.project_id,
                "subject": subject,
                "description": description,
                "custom_fields": [{"id": self.service_field_id, "value": service}],
            }
        });

        let response = self
            .client
            .post(self.url("/issues.json"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AlarmError::Tracker(format!("Issue create failed: {}", e)))?;

        let created: IssueEnvelope = Self::check(response, "Issue create")
            .await?
            .json()
            .await
            .map_err(|e| AlarmError::Tracker(format!("Malformed issue: {}", e)))?;

        debug!("Created Redmine issue #{} for {}", created.issue.id, service);
        Ok(created.issue)
    }

    async fn add_note(&self, issue_id: u64, note: &str) -> Result<(), AlarmError> {
        self.update(issue_id, serde_json::json!({"issue": {"notes": note}}), "Issue note")
            .await
    }

    async fn close_issue(&self, issue_id: u64, note: &str) -> Result<(), AlarmError> {
        self.update(
            issue_id,
            serde_json::json!({"issue": {"status_id": self.closed_status_id, "notes": note}}),
            "Issue close",
        )
        .await
    }
}

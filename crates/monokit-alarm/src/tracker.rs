//! Issue tracker abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

/// An issue as known to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
}

/// Ticket system the alarm engine keeps in sync.
///
/// Issues are identified by a service identity, which is the alarm key.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn name(&self) -> &str;

    /// Find the open issue filed for `service`, if any.
    async fn find_open_issue(&self, service: &str) -> Result<Option<IssueRef>, AlarmError>;

    /// File a new issue for `service`.
    async fn create_issue(
        &self,
        service: &str,
        subject: &str,
        description: &str,
    ) -> Result<IssueRef, AlarmError>;

    /// Append a note to an issue.
    async fn add_note(&self, issue_id: u64, note: &str) -> Result<(), AlarmError>;

    /// Close an issue with a final note.
    async fn close_issue(&self, issue_id: u64, note: &str) -> Result<(), AlarmError>;
}

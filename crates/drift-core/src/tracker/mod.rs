use async_trait::async_trait;

use crate::error::Result;

pub mod format;
mod gitlab;

pub use gitlab::GitLabClient;

/// An issue as the external tracker reports it: the pointer fields the
/// engine persists plus the state it branches on.
#[derive(Debug, Clone)]
pub struct Issue {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub web_url: String,
    pub state: String,
}

/// The full capability surface the orchestrator needs from a tracker.
/// Implementations address one external system; callers hold this trait
/// object and nothing else.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Open a new issue and return the tracker's view of it.
    async fn create_issue(&self, project_id: i64, title: &str, description: &str)
        -> Result<Issue>;

    /// Replace the description of an existing issue.
    async fn update_issue_description(
        &self,
        project_id: i64,
        issue_id: i64,
        description: &str,
    ) -> Result<()>;

    /// Attach a resolution comment referencing `operation`, then close the
    /// issue. The comment is best-effort; the close is not.
    async fn close_issue(&self, project_id: i64, issue_id: i64, operation: &str) -> Result<()>;

    /// Whether the issue exists and is currently open. A missing issue is
    /// "not open", not an error.
    async fn issue_is_open(&self, project_id: i64, issue_id: i64) -> Result<bool>;
}

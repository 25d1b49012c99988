use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};
use crate::tracker::{format, Issue, IssueTracker};

const HEADER_PRIVATE_TOKEN: &str = "PRIVATE-TOKEN";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Labels stamped on every issue the engine opens.
const ISSUE_LABELS: [&str; 2] = ["drift-alert", "automation"];

/// GitLab REST v4 implementation of [`IssueTracker`].
///
/// Issues are addressed by numeric project id and issue iid under
/// `{base_url}/projects/{id}/issues`; the iid doubles as the issue id the
/// engine stores. Authentication uses the `PRIVATE-TOKEN` header.
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: &str, skip_tls_verify: bool) -> Result<Self> {
        if skip_tls_verify {
            tracing::warn!("TLS verification disabled for the issue tracker client");
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|err| DriftError::TrackerUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: token.to_string(),
        })
    }

    fn require_token(&self) -> Result<()> {
        if self.token.is_empty() {
            tracing::error!("issue tracker api token is not configured");
            return Err(DriftError::TrackerUnavailable(
                "GITLAB_API_TOKEN is not set".to_string(),
            ));
        }
        Ok(())
    }

    fn issues_url(&self, project_id: i64) -> String {
        format!("{}/projects/{project_id}/issues", self.base_url)
    }

    fn issue_url(&self, project_id: i64, issue_id: i64) -> String {
        format!("{}/projects/{project_id}/issues/{issue_id}", self.base_url)
    }

    fn notes_url(&self, project_id: i64, issue_id: i64) -> String {
        format!(
            "{}/projects/{project_id}/issues/{issue_id}/notes",
            self.base_url
        )
    }
}

fn check_status(resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DriftError::TrackerRejected {
            status: status.as_u16(),
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct IssueRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [&'a str]>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IssueResponse {
    iid: i64,
    project_id: i64,
    title: String,
    web_url: String,
    state: String,
}

impl From<IssueResponse> for Issue {
    fn from(raw: IssueResponse) -> Self {
        Issue {
            id: raw.iid,
            project_id: raw.project_id,
            title: raw.title,
            web_url: raw.web_url,
            state: raw.state,
        }
    }
}

#[async_trait]
impl IssueTracker for GitLabClient {
    async fn create_issue(
        &self,
        project_id: i64,
        title: &str,
        description: &str,
    ) -> Result<Issue> {
        self.require_token()?;
        let body = IssueRequest {
            title: Some(title),
            description,
            labels: Some(&ISSUE_LABELS[..]),
        };
        let resp = self
            .http
            .post(self.issues_url(project_id))
            .header(HEADER_PRIVATE_TOKEN, &self.token)
            .json(&body)
            .send()
            .await?;
        check_status(&resp)?;
        let issue: IssueResponse = resp.json().await?;
        tracing::info!(project_id, issue_id = issue.iid, "created tracking issue");
        Ok(issue.into())
    }

    async fn update_issue_description(
        &self,
        project_id: i64,
        issue_id: i64,
        description: &str,
    ) -> Result<()> {
        self.require_token()?;
        let body = IssueRequest {
            title: None,
            description,
            labels: None,
        };
        let resp = self
            .http
            .put(self.issue_url(project_id, issue_id))
            .header(HEADER_PRIVATE_TOKEN, &self.token)
            .json(&body)
            .send()
            .await?;
        check_status(&resp)?;
        tracing::info!(project_id, issue_id, "refreshed tracking issue description");
        Ok(())
    }

    async fn close_issue(&self, project_id: i64, issue_id: i64, operation: &str) -> Result<()> {
        self.require_token()?;

        // Comment first so the close carries context. A failed comment is
        // logged and the close still proceeds.
        let comment = serde_json::json!({ "body": format::resolution_comment(operation) });
        match self
            .http
            .post(self.notes_url(project_id, issue_id))
            .header(HEADER_PRIVATE_TOKEN, &self.token)
            .json(&comment)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(project_id, issue_id, "resolution comment added");
            }
            Ok(resp) => {
                tracing::warn!(
                    project_id,
                    issue_id,
                    status = resp.status().as_u16(),
                    "resolution comment rejected"
                );
            }
            Err(err) => {
                tracing::warn!(project_id, issue_id, error = %err, "resolution comment failed");
            }
        }

        let body = serde_json::json!({ "state_event": "close" });
        let resp = self
            .http
            .put(self.issue_url(project_id, issue_id))
            .header(HEADER_PRIVATE_TOKEN, &self.token)
            .json(&body)
            .send()
            .await?;
        check_status(&resp)?;
        tracing::info!(project_id, issue_id, "closed tracking issue");
        Ok(())
    }

    async fn issue_is_open(&self, project_id: i64, issue_id: i64) -> Result<bool> {
        self.require_token()?;
        let resp = self
            .http
            .get(self.issue_url(project_id, issue_id))
            .header(HEADER_PRIVATE_TOKEN, &self.token)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(project_id, issue_id, "issue not found in tracker");
            return Ok(false);
        }
        check_status(&resp)?;
        let issue: IssueResponse = resp.json().await?;
        Ok(issue.state == "opened")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

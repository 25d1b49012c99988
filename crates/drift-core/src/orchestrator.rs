use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::error::{DriftError, Result};
use crate::record::{self, Outcome};
use crate::report::Report;
use crate::store::StateStore;
use crate::threshold::ThresholdPolicy;
use crate::tracker::{format, IssueTracker};

/// The drift state machine. One instance serves every report; all mutable
/// state lives in the store, so concurrent reports contend only there.
/// Two concurrent breaches for the same key can still race past each other
/// and open duplicate issues, an accepted hazard of the lock-free design.
pub struct Orchestrator {
    store: Arc<dyn StateStore>,
    tracker: Arc<dyn IssueTracker>,
    threshold: ThresholdPolicy,
    comparison_branch: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StateStore>,
        tracker: Arc<dyn IssueTracker>,
        comparison_branch: &str,
        default_threshold: i64,
    ) -> Self {
        let threshold = ThresholdPolicy::new(store.clone(), default_threshold);
        Self {
            store,
            tracker,
            threshold,
            comparison_branch: comparison_branch.to_string(),
        }
    }

    /// Apply one report to its environment record, escalating or resolving
    /// the tracked issue as the report dictates, and return the record's
    /// resulting values.
    ///
    /// Store writes land in sequence and are never rolled back; a failure
    /// part way leaves the earlier writes in place, to be reconciled by the
    /// next report for the same key.
    pub async fn process_report(&self, report: &Report) -> Result<Outcome> {
        report.validate()?;

        tracing::info!(
            repo = %report.repo_name,
            environment = %report.environment,
            operation = %report.operation,
            exit_code = report.exit_code,
            scheduled = report.scheduled,
            "processing drift report"
        );

        let key = report.state_key();

        let threshold = if report.drift_threshold.is_empty() {
            self.threshold.default_threshold().to_string()
        } else {
            report.drift_threshold.clone()
        };
        self.store
            .initialize_if_absent(
                &key,
                &report.environment_tier,
                &report.project_id,
                &threshold,
            )
            .await?;

        let timestamp = if report.timestamp.is_empty() {
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        } else {
            report.timestamp.clone()
        };
        self.store
            .record_operation(&key, &timestamp, &report.operation)
            .await?;

        if report.is_escalation(&self.comparison_branch) {
            tracing::info!(
                %key,
                branch = %report.branch_name,
                "drift detected, incrementing counter"
            );
            let drift_count = self.store.increment_drift(&key).await?;
            tracing::info!(%key, drift_count, "drift counter incremented");

            if !report.plan_output.is_empty() {
                self.store
                    .store_plan_output(&key, &report.plan_output)
                    .await?;
            }
            self.handle_breach(&key, report, drift_count).await?;
        }

        if report.is_resolution(&self.comparison_branch) {
            tracing::info!(
                %key,
                operation = %report.operation,
                exit_code = report.exit_code,
                "successful operation, resetting drift counter"
            );
            self.reset(&key, report).await?;
        }

        let record = self.store.read_all(&key).await?;
        let outcome = Outcome::from_record(&record);
        tracing::info!(
            %key,
            drift_count = %outcome.drift_increment,
            issue_id = %outcome.issue_id,
            "drift report processed"
        );
        Ok(outcome)
    }

    /// Escalation once the counter reaches the threshold: refresh the open
    /// tracked issue, or create a fresh one and persist its identifiers.
    async fn handle_breach(&self, key: &str, report: &Report, drift_count: i64) -> Result<()> {
        if !self.threshold.is_breached(key, drift_count).await? {
            tracing::info!(key, drift_count, "threshold not reached, no escalation");
            return Ok(());
        }

        tracing::warn!(
            key,
            drift_count,
            repo = %report.repo_name,
            environment = %report.environment,
            "drift threshold breached"
        );

        let stored_project = self
            .store
            .get_field(key, record::FIELD_PROJECT_ID)
            .await?
            .unwrap_or_default();
        let project_id = parse_project_id(&stored_project)?;

        let existing_issue = self
            .store
            .get_field(key, record::FIELD_ISSUE_ID)
            .await?
            .as_deref()
            .and_then(parse_issue_id);

        // Plan output is display-only; a failed read falls back to empty.
        let plan_output = self
            .store
            .get_field(key, record::FIELD_PLAN_OUTPUT)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let threshold = self.threshold.threshold(key).await?;

        if let Some(issue_id) = existing_issue {
            tracing::info!(key, issue_id, "checking status of tracked issue");
            if self.tracker.issue_is_open(project_id, issue_id).await? {
                let description = format::updated_description(
                    &report.environment,
                    drift_count,
                    threshold,
                    &plan_output,
                );
                self.tracker
                    .update_issue_description(project_id, issue_id, &description)
                    .await?;
                tracing::info!(key, issue_id, "tracked issue refreshed");
                return Ok(());
            }
            tracing::info!(key, issue_id, "tracked issue is closed, creating a new one");
        }

        let description =
            format::created_description(&report.environment, drift_count, threshold, &plan_output);
        let issue = self
            .tracker
            .create_issue(
                project_id,
                &format::issue_title(&report.environment),
                &description,
            )
            .await?;
        tracing::info!(
            key,
            issue_id = issue.id,
            issue_url = %issue.web_url,
            "drift issue created"
        );

        // Two separate writes; a failure after creation leaves the new issue
        // untracked until the next breach opens a replacement.
        self.store
            .set_field(key, record::FIELD_ISSUE_ID, &issue.id.to_string())
            .await?;
        self.store
            .set_field(key, record::FIELD_ISSUE_URL, &issue.web_url)
            .await?;
        Ok(())
    }

    /// Zero the counter and close the tracked issue if one is still open.
    /// Issue pointers are cleared only on a successful close; a reference to
    /// an already-closed issue stays in the record.
    async fn reset(&self, key: &str, report: &Report) -> Result<()> {
        self.store.reset_drift(key).await?;
        tracing::info!(key, "drift counter reset");

        let stored_issue = match self.store.get_field(key, record::FIELD_ISSUE_ID).await {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(key, error = %err, "could not read tracked issue, skipping cleanup");
                return Ok(());
            }
        };
        if stored_issue.is_empty() {
            tracing::debug!(key, "no tracked issue to close");
            return Ok(());
        }
        let issue_id = match parse_issue_id(&stored_issue) {
            Some(id) => id,
            None => return Ok(()),
        };

        let project_id = parse_project_id(&report.project_id)?;

        if self.tracker.issue_is_open(project_id, issue_id).await? {
            tracing::info!(key, issue_id, "closing tracked issue after resolution");
            self.tracker
                .close_issue(project_id, issue_id, &report.operation)
                .await?;
            self.store.set_field(key, record::FIELD_ISSUE_ID, "").await?;
            self.store
                .set_field(key, record::FIELD_ISSUE_URL, "")
                .await?;
            tracing::info!(key, issue_id, "tracked issue closed");
        }
        Ok(())
    }
}

fn parse_project_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| DriftError::InvalidProjectId(raw.to_string()))
}

/// Stored issue ids survive manual edits; anything non-numeric or
/// non-positive reads as "no tracked issue".
fn parse_issue_id(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        Ok(_) => None,
        Err(_) => {
            tracing::warn!(issue_id = raw, "stored issue id is not numeric, ignoring");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

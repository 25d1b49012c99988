use std::collections::HashMap;

use serde::Serialize;

// Hash field names of one environment record. These are the stored (and
// wire-visible) spellings; existing deployments depend on them.
pub const FIELD_DRIFT_THRESHOLD: &str = "driftThreshold";
pub const FIELD_ENVIRONMENT_TIER: &str = "environmentTier";
pub const FIELD_PROJECT_ID: &str = "projectID";
pub const FIELD_DRIFT_INCREMENT: &str = "driftIncrement";
pub const FIELD_LOG: &str = "log";
pub const FIELD_PLAN_OUTPUT: &str = "planOutput";
pub const FIELD_ISSUE_ID: &str = "issueID";
pub const FIELD_ISSUE_URL: &str = "issueURL";

/// Render the `log` field: a small JSON fragment recording the most recent
/// operation. Stored as an opaque string and echoed verbatim in responses.
pub fn log_entry(timestamp: &str, operation: &str) -> String {
    format!(r#"{{"timestamp": "{timestamp}", "operation": "{operation}"}}"#)
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What a processed report yields: the record's current values, all as
/// strings. Fields that were never written read as empty.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub environment_tier: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub drift_increment: String,
    #[serde(rename = "issueID")]
    pub issue_id: String,
    #[serde(rename = "issueURL")]
    pub issue_url: String,
    /// Raw `log` fragment, already JSON.
    pub log: String,
}

impl Outcome {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        let field = |name: &str| record.get(name).cloned().unwrap_or_default();
        Self {
            environment_tier: field(FIELD_ENVIRONMENT_TIER),
            project_id: field(FIELD_PROJECT_ID),
            drift_increment: field(FIELD_DRIFT_INCREMENT),
            issue_id: field(FIELD_ISSUE_ID),
            issue_url: field(FIELD_ISSUE_URL),
            log: field(FIELD_LOG),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_renders_json_fragment() {
        assert_eq!(
            log_entry("2025-06-01T00:00:00Z", "plan"),
            r#"{"timestamp": "2025-06-01T00:00:00Z", "operation": "plan"}"#
        );
    }

    #[test]
    fn outcome_from_full_record() {
        let mut record = HashMap::new();
        record.insert(FIELD_ENVIRONMENT_TIER.to_string(), "prod".to_string());
        record.insert(FIELD_PROJECT_ID.to_string(), "42".to_string());
        record.insert(FIELD_DRIFT_INCREMENT.to_string(), "3".to_string());
        record.insert(FIELD_ISSUE_ID.to_string(), "7".to_string());
        record.insert(
            FIELD_ISSUE_URL.to_string(),
            "https://gitlab.example/issues/7".to_string(),
        );
        record.insert(FIELD_LOG.to_string(), log_entry("t", "plan"));

        let outcome = Outcome::from_record(&record);
        assert_eq!(outcome.environment_tier, "prod");
        assert_eq!(outcome.project_id, "42");
        assert_eq!(outcome.drift_increment, "3");
        assert_eq!(outcome.issue_id, "7");
        assert_eq!(outcome.issue_url, "https://gitlab.example/issues/7");
        assert!(outcome.log.contains("plan"));
    }

    #[test]
    fn outcome_defaults_absent_fields_to_empty() {
        let mut record = HashMap::new();
        record.insert(FIELD_DRIFT_INCREMENT.to_string(), "0".to_string());

        let outcome = Outcome::from_record(&record);
        assert_eq!(outcome.drift_increment, "0");
        assert!(outcome.issue_id.is_empty());
        assert!(outcome.issue_url.is_empty());
    }
}

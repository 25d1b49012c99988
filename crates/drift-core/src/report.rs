use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

/// Operation kinds with orchestration semantics. Anything else only
/// refreshes the operation log.
pub const OP_PLAN: &str = "plan";
pub const OP_APPLY: &str = "apply";
pub const OP_DESTROY: &str = "destroy";

/// `terraform plan -detailed-exitcode` convention: 2 means changes detected.
pub const EXIT_CODE_CHANGES: i32 = 2;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One pipeline run's report, as posted by the CI wrapper. Consumed once by
/// the orchestrator and discarded; never persisted as a whole.
///
/// All fields default so that absent JSON keys deserialize to empty values
/// and are rejected by `validate` rather than by the JSON parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Report {
    pub repo_name: String,
    pub branch_name: String,
    pub environment: String,
    pub environment_tier: String,
    /// Per-environment threshold override; empty means "use the process
    /// default". Kept as a string end to end, parsed only when compared.
    pub drift_threshold: String,
    pub project_id: String,
    pub operation: String,
    pub exit_code: i32,
    pub scheduled: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub plan_output: String,
}

impl Report {
    /// Reject reports missing any field the orchestrator relies on. Fields
    /// are checked in a fixed order and the first gap is reported.
    pub fn validate(&self) -> Result<()> {
        if self.repo_name.is_empty() {
            return Err(DriftError::MissingField("repoName"));
        }
        if self.branch_name.is_empty() {
            return Err(DriftError::MissingField("branchName"));
        }
        if self.environment.is_empty() {
            return Err(DriftError::MissingField("environment"));
        }
        if self.environment_tier.is_empty() {
            return Err(DriftError::MissingField("environmentTier"));
        }
        if self.project_id.is_empty() {
            return Err(DriftError::MissingField("projectId"));
        }
        if self.operation.is_empty() {
            return Err(DriftError::MissingField("operation"));
        }
        Ok(())
    }

    /// Composite store key for this report's repository/environment pair.
    pub fn state_key(&self) -> String {
        state_key(&self.repo_name, &self.environment)
    }

    /// A scheduled comparison-branch plan that detected changes. Only these
    /// reports move the drift counter up.
    pub fn is_escalation(&self, comparison_branch: &str) -> bool {
        self.scheduled
            && self.operation == OP_PLAN
            && self.exit_code == EXIT_CODE_CHANGES
            && self.branch_name == comparison_branch
    }

    /// An apply (any exit code), or a clean comparison-branch plan. Either
    /// proves the environment converged and resets the counter.
    pub fn is_resolution(&self, comparison_branch: &str) -> bool {
        self.operation == OP_APPLY
            || (self.operation == OP_PLAN
                && self.exit_code == 0
                && self.branch_name == comparison_branch)
    }
}

/// Join repository and environment into the store key. A plain join with no
/// escaping: names containing the delimiter produce ambiguous but
/// deterministic keys.
pub fn state_key(repo_name: &str, environment: &str) -> String {
    format!("{repo_name}:{environment}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_report() -> Report {
        Report {
            repo_name: "my-repo".to_string(),
            branch_name: "main".to_string(),
            environment: "production".to_string(),
            environment_tier: "prod".to_string(),
            project_id: "42".to_string(),
            operation: OP_PLAN.to_string(),
            exit_code: EXIT_CODE_CHANGES,
            scheduled: true,
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_complete_report() {
        assert!(valid_report().validate().is_ok());
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let cases: &[(fn(&mut Report), &str)] = &[
            (|r| r.repo_name.clear(), "missing repoName in payload"),
            (|r| r.branch_name.clear(), "missing branchName in payload"),
            (|r| r.environment.clear(), "missing environment in payload"),
            (
                |r| r.environment_tier.clear(),
                "missing environmentTier in payload",
            ),
            (|r| r.project_id.clear(), "missing projectId in payload"),
            (|r| r.operation.clear(), "missing operation in payload"),
        ];

        for (clear, expected) in cases {
            let mut report = valid_report();
            clear(&mut report);
            let err = report.validate().unwrap_err();
            assert_eq!(err.to_string(), *expected);
        }
    }

    #[test]
    fn validate_checks_fields_in_fixed_order() {
        // Everything missing: the first field in the order wins.
        let report = Report::default();
        assert_eq!(
            report.validate().unwrap_err().to_string(),
            "missing repoName in payload"
        );
    }

    #[test]
    fn state_key_joins_repo_and_environment() {
        assert_eq!(state_key("my-repo", "production"), "my-repo:production");
    }

    #[test]
    fn state_key_keeps_empty_parts() {
        assert_eq!(state_key("", "production"), ":production");
        assert_eq!(state_key("my-repo", ""), "my-repo:");
        assert_eq!(state_key("", ""), ":");
    }

    #[test]
    fn state_key_does_not_escape_delimiters() {
        assert_eq!(state_key("a:b", "c"), "a:b:c");
    }

    #[test]
    fn escalation_requires_every_condition() {
        assert!(valid_report().is_escalation("main"));

        let mut unscheduled = valid_report();
        unscheduled.scheduled = false;
        assert!(!unscheduled.is_escalation("main"));

        let mut clean = valid_report();
        clean.exit_code = 0;
        assert!(!clean.is_escalation("main"));

        let mut feature_branch = valid_report();
        feature_branch.branch_name = "feature/x".to_string();
        assert!(!feature_branch.is_escalation("main"));

        let mut apply = valid_report();
        apply.operation = OP_APPLY.to_string();
        apply.exit_code = EXIT_CODE_CHANGES;
        assert!(!apply.is_escalation("main"));
    }

    #[test]
    fn apply_resolves_regardless_of_exit_code() {
        let mut report = valid_report();
        report.operation = OP_APPLY.to_string();
        report.exit_code = 1;
        assert!(report.is_resolution("main"));
    }

    #[test]
    fn clean_plan_resolves_only_on_the_comparison_branch() {
        let mut report = valid_report();
        report.exit_code = 0;
        assert!(report.is_resolution("main"));
        assert!(!report.is_resolution("trunk"));

        let mut drifted = valid_report();
        drifted.exit_code = EXIT_CODE_CHANGES;
        assert!(!drifted.is_resolution("main"));
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let report: Report = serde_json::from_str(
            r#"{"repoName":"svc","branchName":"main","environment":"prod",
                "environmentTier":"prod","projectId":"7","operation":"plan",
                "exitCode":2,"scheduled":true}"#,
        )
        .unwrap();
        assert!(report.drift_threshold.is_empty());
        assert!(report.timestamp.is_empty());
        assert!(report.plan_output.is_empty());
        assert!(report.validate().is_ok());
    }

    #[test]
    fn serializes_without_empty_plan_output() {
        let json = serde_json::to_string(&valid_report()).unwrap();
        assert!(!json.contains("planOutput"));

        let mut with_output = valid_report();
        with_output.plan_output = "~ changed".to_string();
        let json = serde_json::to_string(&with_output).unwrap();
        assert!(json.contains("planOutput"));
    }
}

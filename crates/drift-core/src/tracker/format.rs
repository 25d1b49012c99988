//! Markdown content for drift tracking issues.

use chrono::Utc;

/// Issue title for a drifted environment.
pub fn issue_title(environment: &str) -> String {
    format!("Drift: {environment}")
}

/// Body for a freshly created issue.
pub fn created_description(
    environment: &str,
    drift_count: i64,
    threshold: i64,
    plan_output: &str,
) -> String {
    render(environment, drift_count, threshold, plan_output, "created")
}

/// Body for refreshing an issue that is already open.
pub fn updated_description(
    environment: &str,
    drift_count: i64,
    threshold: i64,
    plan_output: &str,
) -> String {
    render(environment, drift_count, threshold, plan_output, "updated")
}

/// Comment attached to an issue before it is closed on resolution.
pub fn resolution_comment(operation: &str) -> String {
    format!(
        "**Drift Resolved** - Infrastructure drift has been resolved through successful \
         Terraform `{operation}` operation. Issue automatically closed by Drift Guardian."
    )
}

fn render(
    environment: &str,
    drift_count: i64,
    threshold: i64,
    plan_output: &str,
    verb: &str,
) -> String {
    let mut body = format!(
        "# Drift report for `{environment}` environment\n\n\
         Environment **{environment}** has a drift increment of **{drift_count}**, \
         which meets or exceeds the configured threshold of **{threshold}**.\n\n\
         Please investigate and address this drift as soon as possible.\n\n"
    );
    if !plan_output.is_empty() {
        body.push_str(&format!(
            "## Terraform Plan Output\n\n```\n{plan_output}\n```\n\n"
        ));
    }
    body.push_str(&format!(
        "*This issue was automatically {verb} by Drift Guardian on {}*",
        Utc::now().format("%a, %d %b %Y %H:%M:%S UTC")
    ));
    body
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_names_the_environment() {
        assert_eq!(issue_title("production"), "Drift: production");
    }

    #[test]
    fn created_body_carries_count_and_threshold() {
        let body = created_description("production", 3, 2, "");
        assert!(body.starts_with("# Drift report for `production` environment\n\n"));
        assert!(body.contains("drift increment of **3**"));
        assert!(body.contains("threshold of **2**"));
        assert!(body.contains("automatically created by Drift Guardian on "));
        assert!(!body.contains("## Terraform Plan Output"));
    }

    #[test]
    fn updated_body_uses_the_updated_verb() {
        let body = updated_description("staging", 5, 1, "");
        assert!(body.contains("automatically updated by Drift Guardian on "));
    }

    #[test]
    fn plan_output_is_fenced_when_present() {
        let body = created_description("production", 1, 1, "~ aws_instance.web");
        assert!(body.contains("## Terraform Plan Output\n\n```\n~ aws_instance.web\n```\n\n"));
    }

    #[test]
    fn resolution_comment_names_the_operation() {
        let comment = resolution_comment("apply");
        assert!(comment.starts_with("**Drift Resolved**"));
        assert!(comment.contains("Terraform `apply` operation"));
        assert!(comment.ends_with("closed by Drift Guardian."));
    }
}

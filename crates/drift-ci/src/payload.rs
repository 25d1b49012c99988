use chrono::{SecondsFormat, Utc};

use drift_core::report::{Report, EXIT_CODE_CHANGES, OP_PLAN};

use crate::debug;

/// Stand-in for any pipeline variable that is not set. The server keys
/// records on repository and environment, so unset variables all collapse
/// into one shared record rather than failing the run.
pub const DEFAULT_VALUE: &str = "default";

/// Plan output beyond this many bytes is cut to keep payloads reasonable.
const MAX_PLAN_OUTPUT: usize = 50_000;
const TRUNCATION_MARKER: &str = "\n... [output truncated due to size]\n";

/// Assemble the report for this run from GitLab CI variables.
pub fn collect(operation: &str, exit_code: i32, scheduled: bool, plan_output: &str) -> Report {
    collect_from(
        |name| std::env::var(name).ok(),
        operation,
        exit_code,
        scheduled,
        plan_output,
    )
}

/// As `collect`, with the variable source injected.
pub fn collect_from(
    lookup: impl Fn(&str) -> Option<String>,
    operation: &str,
    exit_code: i32,
    scheduled: bool,
    plan_output: &str,
) -> Report {
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

    let repo_name = var("CI_PROJECT_NAME")
        .or_else(|| var("CI_PROJECT_TITLE"))
        .unwrap_or_else(|| {
            debug::log("Warning: neither CI_PROJECT_NAME nor CI_PROJECT_TITLE is set");
            DEFAULT_VALUE.to_string()
        });

    let or_default = |name: &str| {
        var(name).unwrap_or_else(|| {
            debug::log(format!("Warning: {name} is not set, using '{DEFAULT_VALUE}'"));
            DEFAULT_VALUE.to_string()
        })
    };

    let attach_output = operation == OP_PLAN && exit_code == EXIT_CODE_CHANGES;

    Report {
        repo_name,
        branch_name: or_default("CI_COMMIT_BRANCH"),
        environment: or_default("CI_ENVIRONMENT_NAME"),
        environment_tier: or_default("CI_ENVIRONMENT_TIER"),
        drift_threshold: var("DRIFT_THRESHOLD").unwrap_or_default(),
        project_id: or_default("CI_PROJECT_ID"),
        operation: operation.to_string(),
        exit_code,
        scheduled,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        plan_output: if attach_output {
            truncate_plan_output(plan_output.to_string())
        } else {
            String::new()
        },
    }
}

/// Cut oversized plan output at the byte limit, backing up to a character
/// boundary, and mark the cut.
fn truncate_plan_output(mut output: String) -> String {
    if output.len() <= MAX_PLAN_OUTPUT {
        return output;
    }
    let mut end = MAX_PLAN_OUTPUT;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    output.truncate(end);
    output.push_str(TRUNCATION_MARKER);
    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

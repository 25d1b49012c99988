use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use drift_core::{Outcome, Report};

use crate::error::AppError;
use crate::state::AppState;

// Response headers echoing record values back to the pipeline. Only set
// when the record actually has a value for them.
const HEADER_ENVIRONMENT_TIER: &str = "x-environment-tier";
const HEADER_DRIFT_INCREMENT: &str = "x-drift-increment";
const HEADER_PROJECT_ID: &str = "x-project-id";
const HEADER_ISSUE_ID: &str = "x-issue-id";
const HEADER_ISSUE_URL: &str = "x-issue-url";

/// POST /environments: ingest one pipeline report.
///
/// The body is read raw and parsed here rather than through the `Json`
/// extractor so malformed JSON maps to the pipeline-visible 400 message no
/// matter what content type the sender declared.
pub async fn report_environment(
    State(app): State<AppState>,
    body: String,
) -> Result<Response, AppError> {
    let report: Report = match serde_json::from_str(&body) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting unparseable report payload");
            return Err(AppError::bad_request("Error parsing JSON payload"));
        }
    };

    let outcome = app.orchestrator.process_report(&report).await?;
    Ok(success_response(&report, &outcome))
}

/// Render the legacy plain-text success response. The `\n` in the body is a
/// literal backslash-n, and `log` is spliced in unquoted; pipeline scripts
/// parse this exact shape.
fn success_response(report: &Report, outcome: &Outcome) -> Response {
    let mut headers = HeaderMap::new();
    set_if_present(&mut headers, HEADER_ENVIRONMENT_TIER, &outcome.environment_tier);
    set_if_present(&mut headers, HEADER_DRIFT_INCREMENT, &outcome.drift_increment);
    set_if_present(&mut headers, HEADER_PROJECT_ID, &outcome.project_id);
    set_if_present(&mut headers, HEADER_ISSUE_ID, &outcome.issue_id);
    set_if_present(&mut headers, HEADER_ISSUE_URL, &outcome.issue_url);

    let body = format!(
        "Environment values retrieved for repository: {repo}, environment: {env}\\nValues: {{\"environmentTier\": \"{tier}\", \"projectID\": \"{project_id}\", \"driftIncrement\": \"{increment}\", \"issueID\": \"{issue_id}\", \"issueURL\": \"{issue_url}\", \"log\": {log}}}",
        repo = report.repo_name,
        env = report.environment,
        tier = outcome.environment_tier,
        project_id = outcome.project_id,
        increment = outcome.drift_increment,
        issue_id = outcome.issue_id,
        issue_url = outcome.issue_url,
        log = outcome.log,
    );

    (StatusCode::OK, headers, body).into_response()
}

fn set_if_present(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if value.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::record::log_entry;
    use http_body_util::BodyExt;

    fn sample_report() -> Report {
        Report {
            repo_name: "svc".to_string(),
            environment: "production".to_string(),
            ..Report::default()
        }
    }

    fn full_outcome() -> Outcome {
        Outcome {
            environment_tier: "prod".to_string(),
            project_id: "42".to_string(),
            drift_increment: "3".to_string(),
            issue_id: "7".to_string(),
            issue_url: "https://gitlab.example.com/issues/7".to_string(),
            log: log_entry("2025-06-01T00:00:00Z", "plan"),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn success_body_matches_the_legacy_format() {
        let response = success_response(&sample_report(), &full_outcome());
        assert_eq!(
            body_text(response).await,
            "Environment values retrieved for repository: svc, environment: production\\n\
             Values: {\"environmentTier\": \"prod\", \"projectID\": \"42\", \
             \"driftIncrement\": \"3\", \"issueID\": \"7\", \
             \"issueURL\": \"https://gitlab.example.com/issues/7\", \
             \"log\": {\"timestamp\": \"2025-06-01T00:00:00Z\", \"operation\": \"plan\"}}"
        );
    }

    #[tokio::test]
    async fn headers_echo_the_record_values() {
        let response = success_response(&sample_report(), &full_outcome());
        let headers = response.headers();
        assert_eq!(headers[HEADER_ENVIRONMENT_TIER], "prod");
        assert_eq!(headers[HEADER_DRIFT_INCREMENT], "3");
        assert_eq!(headers[HEADER_PROJECT_ID], "42");
        assert_eq!(headers[HEADER_ISSUE_ID], "7");
        assert_eq!(
            headers[HEADER_ISSUE_URL],
            "https://gitlab.example.com/issues/7"
        );
    }

    #[tokio::test]
    async fn empty_record_values_produce_no_headers() {
        let outcome = Outcome {
            drift_increment: "0".to_string(),
            ..Outcome::default()
        };
        let response = success_response(&sample_report(), &outcome);
        let headers = response.headers();
        assert_eq!(headers[HEADER_DRIFT_INCREMENT], "0");
        assert!(!headers.contains_key(HEADER_ISSUE_ID));
        assert!(!headers.contains_key(HEADER_ISSUE_URL));
        assert!(!headers.contains_key(HEADER_ENVIRONMENT_TIER));
        assert!(!headers.contains_key(HEADER_PROJECT_ID));
    }
}

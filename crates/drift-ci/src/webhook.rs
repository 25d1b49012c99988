use std::time::Duration;

use drift_core::Report;

use crate::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;

/// POST the report to `{endpoint}/environments`, retrying twice with
/// 1s/2s backoff. Best-effort: failures are printed but never fatal, so
/// the pipeline outcome cannot depend on the guardian being reachable.
pub fn send_report(endpoint: &str, report: &Report) {
    let body = match serde_json::to_string(report) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("Error serializing drift report: {err}");
            return;
        }
    };

    let url = format!("{endpoint}/environments");
    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();

    for attempt in 1..=MAX_ATTEMPTS {
        match agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(response) => {
                debug::log(format!(
                    "drift report delivered to {url}, status: {}",
                    response.status()
                ));
                return;
            }
            Err(ureq::Error::Status(code, _)) => {
                eprintln!(
                    "Received non-success status code: {code} (attempt {attempt}/{MAX_ATTEMPTS})"
                );
            }
            Err(err) => {
                eprintln!("Error sending drift report (attempt {attempt}/{MAX_ATTEMPTS}): {err}");
            }
        }

        if attempt < MAX_ATTEMPTS {
            let backoff = Duration::from_secs(1 << (attempt - 1));
            debug::log(format!("retrying in {backoff:?}"));
            std::thread::sleep(backoff);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report {
            repo_name: "svc".to_string(),
            branch_name: "main".to_string(),
            environment: "production".to_string(),
            environment_tier: "prod".to_string(),
            project_id: "42".to_string(),
            operation: "plan".to_string(),
            exit_code: 2,
            scheduled: true,
            timestamp: "2025-06-01T00:00:00Z".to_string(),
            ..Report::default()
        }
    }

    #[test]
    fn delivers_the_report_as_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/environments")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "repoName": "svc",
                "environment": "production",
                "operation": "plan",
                "exitCode": 2,
                "scheduled": true,
            })))
            .with_status(200)
            .create();

        send_report(&server.url(), &report());
        mock.assert();
    }

    #[test]
    fn server_errors_are_retried_and_swallowed() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/environments")
            .with_status(500)
            .expect(3)
            .create();

        send_report(&server.url(), &report());
        mock.assert();
    }

    #[test]
    fn unreachable_endpoint_is_not_fatal() {
        // Port 9 (discard) refuses connections immediately.
        send_report("http://127.0.0.1:9", &report());
    }
}

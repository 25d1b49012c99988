use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drift_core::DriftError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 Bad Request errors
// ---------------------------------------------------------------------------

/// Private sentinel error type used to carry an explicit HTTP 400 through
/// the `anyhow::Error` chain without touching the `DriftError` enum. Used
/// for request-shape problems caught before the orchestrator runs.
#[derive(Debug)]
struct BadRequest(String);

impl std::fmt::Display for BadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequest {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Payload validation failures surface as 400 with the message verbatim;
/// everything else collapses to 500. Bodies are plain text, which is what
/// the pipeline wrapper prints on failure.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(b) = self.0.downcast_ref::<BadRequest>() {
            return (StatusCode::BAD_REQUEST, b.0.clone()).into_response();
        }

        let status = if let Some(e) = self.0.downcast_ref::<DriftError>() {
            match e {
                DriftError::MissingField(_) => StatusCode::BAD_REQUEST,
                DriftError::StoreUnavailable(_)
                | DriftError::NotFound(_)
                | DriftError::InvalidThreshold(_)
                | DriftError::InvalidProjectId(_)
                | DriftError::TrackerUnavailable(_)
                | DriftError::TrackerRejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

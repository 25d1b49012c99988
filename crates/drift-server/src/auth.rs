use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Controls bearer authentication for the report endpoint.
///
/// When `enabled` is false the middleware is a transparent no-op. When it is
/// true, every request must carry `Authorization: Bearer <token>`; an empty
/// configured token locks the endpoint, since no presented token can match.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub token: String,
}

impl AuthConfig {
    /// Authentication off; the middleware passes all requests through.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Authentication on with the given shared token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            enabled: true,
            token: token.into(),
        }
    }
}

/// Axum middleware that gates requests behind a bearer token.
///
/// Flow (evaluated in order):
/// 1. Authentication disabled → passthrough
/// 2. No parseable `Bearer <token>` credential → 401 "Bearer token required"
/// 3. Token mismatch (or empty configured token) → 401 "Invalid token"
pub async fn require_bearer(
    State(config): State<AuthConfig>,
    req: Request,
    next: Next,
) -> Response {
    if !config.enabled {
        return next.run(req).await;
    }

    let Some(presented) = bearer_token(&req) else {
        tracing::warn!(path = %req.uri().path(), "rejected request without bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            "Unauthorized: Bearer token required",
        )
            .into_response();
    };

    if config.token.is_empty() || presented != config.token {
        tracing::warn!(path = %req.uri().path(), "rejected request with invalid bearer token");
        return (StatusCode::UNAUTHORIZED, "Unauthorized: Invalid token").into_response();
    }

    next.run(req).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the token out of an `Authorization: Bearer ...` header. Whitespace
/// around the token is ignored; a missing header, a different scheme, and a
/// blank token all read as "no credential presented".
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::state::AppState;

const SERVICE_NAME: &str = "drift-guardian";

/// Readiness gives the store this long to answer before reporting it down.
const READY_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /health: liveness probe. Always healthy while the process runs;
/// no dependencies are consulted.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready: readiness probe. Pings the store and reports 503 until it
/// answers, so load balancers stop routing reports at a dead backend.
pub async fn ready(State(app): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let start = Instant::now();
    let ping = tokio::time::timeout(READY_PING_TIMEOUT, app.store.ping()).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let (healthy, redis) = match ping {
        Ok(Ok(())) => (
            true,
            serde_json::json!({
                "healthy": true,
                "status": "connected",
                "response_time_ms": response_time_ms,
            }),
        ),
        Ok(Err(err)) => (
            false,
            serde_json::json!({
                "healthy": false,
                "error": err.to_string(),
                "response_time_ms": response_time_ms,
            }),
        ),
        Err(_) => (
            false,
            serde_json::json!({
                "healthy": false,
                "error": "ping timed out",
                "response_time_ms": response_time_ms,
            }),
        ),
    };

    let (status, overall) = if healthy {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (
        status,
        Json(serde_json::json!({
            "status": overall,
            "timestamp": Utc::now(),
            "service": SERVICE_NAME,
            "dependencies": {
                "redis": redis,
            },
        })),
    )
}

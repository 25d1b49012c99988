pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

pub use config::ServerConfig;
pub use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
///
/// Auth and request logging guard only the report endpoint; the probes stay
/// open so orchestrators can always reach them. The hardening headers go on
/// every response, including errors produced by the middleware itself.
pub fn build_router(state: AppState) -> Router {
    let reports = Router::new()
        .route("/environments", post(routes::environments::report_environment))
        .layer(middleware::from_fn(logging::log_requests))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .merge(reports)
        .route("/health", get(routes::health::health))
        .route("/ready", get(routes::health::ready))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// Bind the configured port and serve until the process is stopped.
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("drift guardian listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

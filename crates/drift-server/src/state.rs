use std::sync::Arc;

use drift_core::store::StateStore;
use drift_core::Orchestrator;

use crate::auth::AuthConfig;

/// Shared application state passed to all route handlers.
///
/// The store appears twice: the orchestrator owns a handle for report
/// processing, and the readiness probe pings it directly.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn StateStore>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn StateStore>, auth: AuthConfig) -> Self {
        Self {
            orchestrator,
            store,
            auth,
        }
    }
}

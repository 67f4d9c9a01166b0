use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the analyzers and the result cache; shared by every request.
    pub orchestrator: Arc<Orchestrator>,
}

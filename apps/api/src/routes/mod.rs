pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis", post(handlers::handle_analyze))
        .route("/api/v1/analysis/cache", get(handlers::handle_cache_stats))
        .route(
            "/api/v1/analysis/cache/:fingerprint",
            delete(handlers::handle_invalidate),
        )
        .with_state(state)
}

//! Router configuration.

use crate::handlers::{health, sell};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `POST /sell` (any other method on `/sell` is answered with 405)
/// - `GET /health`
/// - `GET /ready`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sell", post(sell::sell))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use ticket_core::InventoryCounts;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check the store.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Always `true` when returned with 200
    pub ready: bool,
    /// Event whose inventory was inspected
    pub event_id: i64,
    /// Ticket counts of the default event
    pub inventory: InventoryCounts,
}

/// Readiness check endpoint.
///
/// Asks the store for the default event's inventory. Returns 200 with the
/// counts when the store answers, 503 otherwise.
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
///
/// # Errors
///
/// 503 Service Unavailable if the store query fails.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, AppError> {
    let event_id = state.defaults.event_id;
    let inventory = state.store().count_by_status(event_id).await.map_err(|e| {
        AppError::unavailable("Ticket store unavailable").with_source(anyhow::Error::new(e))
    })?;

    Ok(Json(ReadinessResponse {
        ready: true,
        event_id: event_id.get(),
        inventory,
    }))
}

//! Ticket sale endpoint.
//!
//! - POST /sell - hold one ticket for the caller
//!
//! # Request
//!
//! ```json
//! { "event_id": 1, "user_id": "alice", "hold_minutes": 15 }
//! ```
//!
//! Every field is optional: a missing or zero `event_id`, a missing or blank
//! `user_id` and a missing or non-positive `hold_minutes` fall back to the
//! configured [`AllocationDefaults`](ticket_core::AllocationDefaults). A
//! `hold_minutes` above [`MAX_HOLD_MINUTES`] is rejected.
//!
//! # Responses
//!
//! | Status | Body | Meaning |
//! |---|---|---|
//! | 200 | `{"ticket_id": 42}` | ticket held |
//! | 409 | `{"error": "sold_out"}` | no ticket left for the event |
//! | 400 | `{"code": "BAD_REQUEST", ...}` | body is not a valid request, or hold too long |
//! | 500 | `{"code": "INTERNAL_SERVER_ERROR", ...}` | store failure |

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ticket_core::types::{
    Allocation, AllocationRequest, MAX_HOLD_MINUTES, TicketId, hold_from_minutes,
};

/// Body of `POST /sell`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SellRequest {
    /// Event to buy from
    #[serde(default)]
    pub event_id: Option<i64>,
    /// Buyer identity recorded on the ticket
    #[serde(default)]
    pub user_id: Option<String>,
    /// Requested hold length in minutes
    #[serde(default)]
    pub hold_minutes: Option<i64>,
}

/// Successful sale.
#[derive(Debug, Serialize, Deserialize)]
pub struct SellResponse {
    /// The held ticket
    pub ticket_id: TicketId,
}

/// Body returned with `409 Conflict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SoldOutResponse {
    /// Always `"sold_out"`
    pub error: String,
}

impl SellRequest {
    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns a bad request error for a negative `event_id` or a
    /// `hold_minutes` above [`MAX_HOLD_MINUTES`].
    pub fn into_allocation(
        self,
        defaults: &ticket_core::AllocationDefaults,
    ) -> Result<AllocationRequest, AppError> {
        if let Some(event_id) = self.event_id.filter(|id| *id < 0) {
            return Err(AppError::bad_request(format!(
                "event_id must not be negative, got {event_id}"
            )));
        }
        if let Some(minutes) = self.hold_minutes.filter(|m| *m > 0) {
            if hold_from_minutes(minutes).is_none() {
                return Err(AppError::bad_request(format!(
                    "hold_minutes must be at most {MAX_HOLD_MINUTES}, got {minutes}"
                )));
            }
        }
        Ok(defaults.apply(self.event_id, self.user_id, self.hold_minutes))
    }
}

/// Hold one ticket.
///
/// The body is decoded by hand rather than with the `Json` extractor so any
/// undecodable body, with or without a JSON content type, is a plain 400.
///
/// # Errors
///
/// - 400 if the body is not a valid [`SellRequest`] or the hold is too long
/// - 500 if the store fails
pub async fn sell(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request: SellRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {e}")))?;
    let request = request.into_allocation(&state.defaults)?;

    match state.allocator.allocate(&request).await? {
        Allocation::Held { ticket_id, .. } => {
            Ok((StatusCode::OK, Json(SellResponse { ticket_id })).into_response())
        }
        Allocation::SoldOut => Ok((
            StatusCode::CONFLICT,
            Json(SoldOutResponse {
                error: "sold_out".to_string(),
            }),
        )
            .into_response()),
    }
}

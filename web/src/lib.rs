//! Axum HTTP adapter for the ticket allocator.
//!
//! This crate is the thin network-facing shell around `ticket-core`:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, defaults, status codes
//! ├─────────────────────────────────────────┤
//! │         Allocator (ticket-core)         │  ← one atomic claim per request
//! ├─────────────────────────────────────────┤
//! │         TicketStore                     │  ← PostgreSQL / in-memory
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at `POST /sell`
//! 2. **Decode** the JSON body into a [`SellRequest`](handlers::sell::SellRequest)
//! 3. **Apply defaults** to build an `AllocationRequest`
//! 4. **Allocate** through the shared `Allocator`
//! 5. **Map result** to 200 / 409 / 500
//!
//! # Example
//!
//! ```ignore
//! use ticket_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(allocator, AllocationDefaults::default()));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;

//! Application state for Axum handlers.

use std::sync::Arc;
use ticket_core::types::AllocationDefaults;
use ticket_core::{Allocator, TicketStore};

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply, via `Arc`s inside the allocator) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Allocator serving `POST /sell`
    pub allocator: Allocator,
    /// Defaults applied to incomplete sell requests
    pub defaults: Arc<AllocationDefaults>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(allocator: Allocator, defaults: AllocationDefaults) -> Self {
        Self {
            allocator,
            defaults: Arc::new(defaults),
        }
    }

    /// The store behind the allocator (used by readiness checks).
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        self.allocator.store()
    }
}

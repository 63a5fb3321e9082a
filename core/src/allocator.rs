//! Ticket allocator.
//!
//! The allocator is deliberately thin: it stamps the hold expiry from the
//! injected [`Clock`], performs exactly one
//! [`claim_available`](TicketStore::claim_available) round trip, and sorts the
//! result into held / sold out / failure. It keeps no state of its own and
//! takes no locks, so any number of calls can run in parallel on clones of
//! the same allocator.
//!
//! Store faults are never retried here. Whether a claim that timed out was
//! committed is unknowable from this side, and retrying could hold a second
//! ticket for the same requester.

use crate::environment::Clock;
use crate::store::{StoreError, TicketStore};
use crate::types::{Allocation, AllocationRequest};
use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors returned by [`Allocator::allocate`].
///
/// Running out of tickets is not an error; see [`Allocation::SoldOut`].
#[derive(Error, Debug)]
pub enum AllocateError {
    /// The store failed while claiming.
    #[error("Ticket store failure: {0}")]
    Store(#[from] StoreError),

    /// The hold expiry is not representable; nothing was claimed.
    #[error("Hold of {0} is out of range")]
    HoldOutOfRange(Duration),
}

/// Allocates tickets from a [`TicketStore`].
///
/// Cloning is cheap (two `Arc`s).
#[derive(Clone)]
pub struct Allocator {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
}

impl Allocator {
    /// Create an allocator over `store`, stamping expiries with `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    /// Hold one ticket of `request.event_id` for `request.requester_id`.
    ///
    /// # Returns
    ///
    /// - `Allocation::Held` with the ticket and its expiry (`now + hold_duration`)
    /// - `Allocation::SoldOut` when no ticket could be claimed
    ///
    /// # Errors
    ///
    /// - [`AllocateError::Store`] if the store fails. The call is not retried.
    /// - [`AllocateError::HoldOutOfRange`] if `now + hold_duration` overflows;
    ///   the store is not touched.
    pub async fn allocate(&self, request: &AllocationRequest) -> Result<Allocation, AllocateError> {
        let started = Instant::now();
        let held_until = self
            .clock
            .now()
            .checked_add_signed(request.hold_duration)
            .ok_or(AllocateError::HoldOutOfRange(request.hold_duration))?;

        let claimed = self
            .store
            .claim_available(request.event_id, &request.requester_id, held_until)
            .await;

        metrics::histogram!("tickets_allocation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match claimed {
            Ok(Some(ticket_id)) => {
                metrics::counter!("tickets_allocations_total", "outcome" => "held").increment(1);
                tracing::debug!(
                    event_id = %request.event_id,
                    ticket_id = %ticket_id,
                    owner = %request.requester_id,
                    held_until = %held_until,
                    "Ticket held"
                );
                Ok(Allocation::Held {
                    ticket_id,
                    held_until,
                })
            }
            Ok(None) => {
                metrics::counter!("tickets_allocations_total", "outcome" => "sold_out")
                    .increment(1);
                tracing::debug!(
                    event_id = %request.event_id,
                    owner = %request.requester_id,
                    "Sold out"
                );
                Ok(Allocation::SoldOut)
            }
            Err(error) => {
                metrics::counter!("tickets_allocations_total", "outcome" => "error").increment(1);
                tracing::warn!(
                    event_id = %request.event_id,
                    owner = %request.requester_id,
                    transient = error.is_transient(),
                    error = %error,
                    "Ticket claim failed"
                );
                Err(AllocateError::Store(error))
            }
        }
    }
}

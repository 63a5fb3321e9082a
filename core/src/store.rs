//! Ticket store trait and related types.
//!
//! This module defines the capability the allocator requires from a durable
//! store: an atomic "claim one available ticket" operation whose candidate
//! selection never blocks on rows another caller is in the middle of claiming.
//!
//! # Implementations
//!
//! - `PostgresTicketStore` (in `ticket-postgres`): `SELECT ... FOR UPDATE SKIP LOCKED`
//!   inside a single `UPDATE` statement
//! - `InMemoryTicketStore` (in `ticket-testing`): per-row compare-and-swap with a
//!   bounded number of passes
//!
//! # Example
//!
//! ```no_run
//! use ticket_core::store::{StoreError, TicketStore};
//! use ticket_core::types::EventId;
//! use chrono::{Duration, Utc};
//!
//! async fn example<S: TicketStore>(store: &S) -> Result<(), StoreError> {
//!     let event_id = EventId::new(1);
//!     store.insert_available(event_id, 100).await?;
//!
//!     let held_until = Utc::now() + Duration::minutes(15);
//!     if let Some(ticket_id) = store.claim_available(event_id, "user-1", held_until).await? {
//!         println!("holding ticket {ticket_id}");
//!     }
//!     Ok(())
//! }
//! ```

use crate::types::{EventId, InventoryCounts, Ticket, TicketId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during ticket store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or the connection was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store did not answer in time (pool acquire or statement timeout).
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The statement was rejected (constraint violation, bad SQL, ...).
    #[error("Query error: {0}")]
    Query(String),

    /// A row could not be mapped back to domain types.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether a later attempt may succeed without operator action.
    ///
    /// The allocator never retries on its own; this is for callers that do.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Durable ticket storage.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a single handle is shared by every
/// concurrent allocation.
///
/// # Concurrency Contract
///
/// [`claim_available`](TicketStore::claim_available) is the only operation on the
/// hot path. Two concurrent calls must never return the same ticket, and a
/// call must not wait on a candidate row that another in-flight claim holds;
/// it moves on to a different row instead, or reports `None`.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn TicketStore>`), which is how the
/// allocator and seeder receive their store.
pub trait TicketStore: Send + Sync {
    /// Atomically move one `AVAILABLE` ticket of `event_id` to `HELD`.
    ///
    /// The selected ticket gets `owner` as holder and `held_until` as expiry.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: the ticket now held for `owner`
    /// - `Ok(None)`: nothing claimable, either exhausted or every remaining
    ///   candidate is being claimed by someone else right now
    ///
    /// # Errors
    ///
    /// Any store-level fault. Implementations do not retry.
    fn claim_available<'a>(
        &'a self,
        event_id: EventId,
        owner: &'a str,
        held_until: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TicketId>, StoreError>> + Send + 'a>>;

    /// Insert `count` new `AVAILABLE` tickets for `event_id` in one round trip.
    ///
    /// Callers are responsible for keeping `count` bounded; see
    /// [`Seeder`](crate::seeder::Seeder).
    ///
    /// # Returns
    ///
    /// Number of rows inserted.
    ///
    /// # Errors
    ///
    /// Any store-level fault. A failed call inserts nothing.
    fn insert_available(
        &self,
        event_id: EventId,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;

    /// Load a single ticket.
    ///
    /// # Errors
    ///
    /// Any store-level fault, or `Decode` if the stored status is unknown.
    fn find(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>>;

    /// Count the tickets of `event_id` per status.
    ///
    /// # Errors
    ///
    /// Any store-level fault, or `Decode` if a stored status is unknown.
    fn count_by_status(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<InventoryCounts, StoreError>> + Send + '_>>;
}

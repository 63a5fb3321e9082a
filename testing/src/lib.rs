//! # Ticket Testing
//!
//! Testing utilities for ticket allocation.
//!
//! This crate provides:
//! - [`InMemoryTicketStore`]: a compare-and-swap `TicketStore` for tests and database-less runs
//! - [`FailingTicketStore`]: a store whose every call fails
//! - [`FixedClock`]: deterministic time
//! - Helpers to fire concurrent allocations and tally their outcomes
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ticket_core::{Allocator, EventId, Seeder};
//! use ticket_testing::{InMemoryTicketStore, helpers, test_clock};
//!
//! #[tokio::test]
//! async fn ten_tickets_twenty_buyers() {
//!     let store = Arc::new(InMemoryTicketStore::new());
//!     Seeder::new(store.clone()).seed(EventId::new(1), 10).await.unwrap();
//!
//!     let allocator = Allocator::new(store, Arc::new(test_clock()));
//!     let tally = helpers::allocate_concurrently(&allocator, EventId::new(1), 20).await;
//!     assert_eq!(tally.held.len(), 10);
//!     assert_eq!(tally.sold_out, 10);
//! }
//! ```

use chrono::{DateTime, Utc};
use ticket_core::environment::Clock;

mod store;

pub use store::{FailingTicketStore, InMemoryTicketStore};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making hold expiries reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_testing::mocks::FixedClock;
    /// use ticket_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Helpers for driving the allocator concurrently.
pub mod helpers {
    use std::collections::HashSet;
    use std::sync::Arc;
    use ticket_core::types::{Allocation, AllocationRequest, EventId, TicketId};
    use ticket_core::Allocator;
    use tokio::sync::Barrier;
    use tokio::task::JoinSet;

    /// Outcomes of a batch of allocation calls.
    #[derive(Debug, Default, Clone)]
    pub struct Tally {
        /// Tickets returned by successful calls, in completion order
        pub held: Vec<TicketId>,
        /// Calls that reported sold out
        pub sold_out: usize,
        /// Calls that failed with a store error
        pub failed: usize,
    }

    impl Tally {
        /// Total calls recorded.
        #[must_use]
        pub fn total(&self) -> usize {
            self.held.len() + self.sold_out + self.failed
        }

        /// Whether any ticket was handed out twice.
        #[must_use]
        pub fn has_duplicates(&self) -> bool {
            let distinct: HashSet<_> = self.held.iter().collect();
            distinct.len() != self.held.len()
        }
    }

    /// Fire `attempts` allocations for `event_id` at once and tally them.
    ///
    /// Every task waits on a shared barrier before calling the allocator so
    /// the claims genuinely overlap. Each call uses a distinct requester
    /// (`buyer-{i}`). A panicking task counts as failed.
    pub async fn allocate_concurrently(
        allocator: &Allocator,
        event_id: EventId,
        attempts: usize,
    ) -> Tally {
        let barrier = Arc::new(Barrier::new(attempts.max(1)));
        let mut tasks = JoinSet::new();

        for i in 0..attempts {
            let allocator = allocator.clone();
            let barrier = Arc::clone(&barrier);
            tasks.spawn(async move {
                barrier.wait().await;
                let request = AllocationRequest::new(
                    event_id,
                    format!("buyer-{i}"),
                    chrono::Duration::minutes(15),
                );
                allocator.allocate(&request).await
            });
        }

        let mut tally = Tally::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Allocation::Held { ticket_id, .. })) => tally.held.push(ticket_id),
                Ok(Ok(Allocation::SoldOut)) => tally.sold_out += 1,
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "Allocation failed");
                    tally.failed += 1;
                }
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "Allocation task panicked");
                    tally.failed += 1;
                }
            }
        }
        tally
    }

    /// Install a test-friendly tracing subscriber (idempotent).
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use helpers::Tally;
    use ticket_core::types::TicketId;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn tally_detects_duplicates() {
        let mut tally = Tally {
            held: vec![TicketId::new(1), TicketId::new(2)],
            sold_out: 1,
            failed: 0,
        };
        assert!(!tally.has_duplicates());
        assert_eq!(tally.total(), 3);

        tally.held.push(TicketId::new(1));
        assert!(tally.has_duplicates());
    }
}

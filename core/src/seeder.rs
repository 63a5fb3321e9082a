//! Bulk creation of `AVAILABLE` tickets.
//!
//! Seeding runs once, out of band, before load begins. Tickets are inserted
//! in batches of at most [`DEFAULT_BATCH_SIZE`] rows per store round trip so
//! a large pool never turns into one unbounded statement. Batches commit
//! independently: a failure leaves the earlier batches in place and reports
//! how many tickets they created.
//!
//! Nothing here deduplicates. Seeding the same event twice doubles its pool.

use crate::store::{StoreError, TicketStore};
use crate::types::EventId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Rows inserted per store round trip unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A batch failed part way through seeding.
#[derive(Error, Debug)]
#[error("Seeding event {event_id} failed after {inserted} tickets: {source}")]
pub struct SeedError {
    /// Event being seeded
    pub event_id: EventId,
    /// Tickets committed by earlier batches (not rolled back)
    pub inserted: u64,
    /// The store failure
    #[source]
    pub source: StoreError,
}

/// Summary of a completed seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Event that was seeded
    pub event_id: EventId,
    /// Tickets created
    pub inserted: u64,
    /// Store round trips performed
    pub batches: usize,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Creates ticket pools in bounded batches.
#[derive(Clone)]
pub struct Seeder {
    store: Arc<dyn TicketStore>,
    batch_size: usize,
}

impl Seeder {
    /// Create a seeder using [`DEFAULT_BATCH_SIZE`].
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size. Zero is clamped to one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Configured batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Insert `count` `AVAILABLE` tickets for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] carrying the number of tickets already committed
    /// if any batch fails. Seeding stops at the first failing batch.
    pub async fn seed(&self, event_id: EventId, count: usize) -> Result<SeedReport, SeedError> {
        let started = Instant::now();
        let mut remaining = count;
        let mut inserted = 0_u64;
        let mut batches = 0_usize;

        while remaining > 0 {
            let batch = remaining.min(self.batch_size);
            let rows = self
                .store
                .insert_available(event_id, batch)
                .await
                .map_err(|source| SeedError {
                    event_id,
                    inserted,
                    source,
                })?;

            inserted += rows;
            batches += 1;
            remaining -= batch;
            metrics::counter!("tickets_seeded_total").increment(rows);
            tracing::debug!(
                event_id = %event_id,
                batch = batches,
                rows,
                remaining,
                "Seed batch committed"
            );
        }

        let report = SeedReport {
            event_id,
            inserted,
            batches,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            event_id = %event_id,
            inserted = report.inserted,
            batches = report.batches,
            elapsed_ms = report.elapsed.as_millis(),
            "Seeding complete"
        );
        Ok(report)
    }
}

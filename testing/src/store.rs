//! In-memory ticket stores.
//!
//! [`InMemoryTicketStore`] honours the same contract as the `PostgreSQL` store
//! without row locks: every ticket carries an atomic status word and a claim
//! is a compare-and-swap `AVAILABLE → CLAIMING`. Losing the swap means a
//! competitor took that row, so the claimer moves on to the next candidate
//! instead of waiting, which is what `SKIP LOCKED` gives the database.
//!
//! Statuses only ever move forward, so the rows before a pool's scan hint are
//! known to be taken and each claim starts scanning from there.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{OnceLock, RwLock};
use ticket_core::store::{StoreError, TicketStore};
use ticket_core::types::{EventId, InventoryCounts, Ticket, TicketId, TicketStatus};

const AVAILABLE: u8 = 0;
/// Won by a claimer that has not yet recorded the hold. Reads still see the
/// ticket as available, like an uncommitted row update.
const CLAIMING: u8 = 1;
const HELD: u8 = 2;

struct Hold {
    owner: String,
    until: DateTime<Utc>,
}

struct Row {
    id: TicketId,
    status: AtomicU8,
    hold: OnceLock<Hold>,
}

impl Row {
    fn snapshot(&self, event_id: EventId) -> Ticket {
        match (self.status.load(Ordering::Acquire), self.hold.get()) {
            (HELD, Some(hold)) => Ticket {
                id: self.id,
                event_id,
                status: TicketStatus::Held,
                held_by: Some(hold.owner.clone()),
                held_until: Some(hold.until),
            },
            _ => Ticket::available(self.id, event_id),
        }
    }
}

#[derive(Default)]
struct Pool {
    rows: Vec<Row>,
    /// Every row before this index is claimed.
    scan_from: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    pools: HashMap<EventId, Pool>,
    /// `locations[id - 1]` is where ticket `id` lives.
    locations: Vec<(EventId, usize)>,
}

/// In-memory [`TicketStore`] with compare-and-swap claims.
///
/// Claims only take the shared side of the store's `RwLock`; inserts take the
/// exclusive side.
#[derive(Default)]
pub struct InMemoryTicketStore {
    inner: RwLock<Inner>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Connection("in-memory store poisoned".to_string()))
    }

    fn claim(
        &self,
        event_id: EventId,
        owner: &str,
        held_until: DateTime<Utc>,
    ) -> Result<Option<TicketId>, StoreError> {
        let inner = self.read()?;
        let Some(pool) = inner.pools.get(&event_id) else {
            return Ok(None);
        };

        let start = pool.scan_from.load(Ordering::Acquire);
        for (index, row) in pool.rows.iter().enumerate().skip(start) {
            let won = row
                .status
                .compare_exchange(AVAILABLE, CLAIMING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            pool.scan_from.fetch_max(index + 1, Ordering::AcqRel);

            if won {
                let _ = row.hold.set(Hold {
                    owner: owner.to_string(),
                    until: held_until,
                });
                row.status.store(HELD, Ordering::Release);
                return Ok(Some(row.id));
            }
        }
        Ok(None)
    }

    fn insert(&self, event_id: EventId, count: usize) -> Result<u64, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Connection("in-memory store poisoned".to_string()))?;
        let Inner { pools, locations } = &mut *inner;
        let pool = pools.entry(event_id).or_default();

        for _ in 0..count {
            let id = i64::try_from(locations.len() + 1)
                .map_err(|e| StoreError::Query(format!("ticket id overflow: {e}")))?;
            locations.push((event_id, pool.rows.len()));
            pool.rows.push(Row {
                id: TicketId::new(id),
                status: AtomicU8::new(AVAILABLE),
                hold: OnceLock::new(),
            });
        }
        Ok(count as u64)
    }

    fn lookup(&self, ticket_id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let inner = self.read()?;
        let Some(slot) = ticket_id
            .get()
            .checked_sub(1)
            .and_then(|slot| usize::try_from(slot).ok())
        else {
            return Ok(None);
        };
        let Some(&(event_id, index)) = inner.locations.get(slot) else {
            return Ok(None);
        };
        Ok(inner
            .pools
            .get(&event_id)
            .and_then(|pool| pool.rows.get(index))
            .map(|row| row.snapshot(event_id)))
    }

    fn counts(&self, event_id: EventId) -> Result<InventoryCounts, StoreError> {
        let inner = self.read()?;
        let mut counts = InventoryCounts::default();
        if let Some(pool) = inner.pools.get(&event_id) {
            for row in &pool.rows {
                counts.add(row.snapshot(event_id).status, 1);
            }
        }
        Ok(counts)
    }
}

impl TicketStore for InMemoryTicketStore {
    fn claim_available<'a>(
        &'a self,
        event_id: EventId,
        owner: &'a str,
        held_until: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TicketId>, StoreError>> + Send + 'a>> {
        Box::pin(async move { self.claim(event_id, owner, held_until) })
    }

    fn insert_available(
        &self,
        event_id: EventId,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move { self.insert(event_id, count) })
    }

    fn find(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { self.lookup(ticket_id) })
    }

    fn count_by_status(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<InventoryCounts, StoreError>> + Send + '_>> {
        Box::pin(async move { self.counts(event_id) })
    }
}

/// A store whose every call fails with `StoreError::Connection`.
#[derive(Debug, Clone)]
pub struct FailingTicketStore {
    message: String,
}

impl FailingTicketStore {
    /// Fail every call with `StoreError::Connection(message)`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Connection(self.message.clone())
    }
}

impl TicketStore for FailingTicketStore {
    fn claim_available<'a>(
        &'a self,
        _event_id: EventId,
        _owner: &'a str,
        _held_until: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TicketId>, StoreError>> + Send + 'a>> {
        Box::pin(async move { Err(self.error()) })
    }

    fn insert_available(
        &self,
        _event_id: EventId,
        _count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move { Err(self.error()) })
    }

    fn find(
        &self,
        _ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Err(self.error()) })
    }

    fn count_by_status(
        &self,
        _event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<InventoryCounts, StoreError>> + Send + '_>> {
        Box::pin(async move { Err(self.error()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    use ticket_core::environment::Clock;

    fn expiry() -> DateTime<Utc> {
        crate::test_clock().now() + Duration::minutes(15)
    }

    #[tokio::test]
    async fn ids_are_sequential_across_events() {
        let store = InMemoryTicketStore::new();
        store.insert_available(EventId::new(1), 2).await.unwrap();
        store.insert_available(EventId::new(2), 1).await.unwrap();

        let third = store.find(TicketId::new(3)).await.unwrap().unwrap();
        assert_eq!(third.event_id, EventId::new(2));
        assert_eq!(third.status, TicketStatus::Available);
        assert!(store.find(TicketId::new(4)).await.unwrap().is_none());
        assert!(store.find(TicketId::new(0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claims_in_id_order_then_runs_dry() {
        let store = InMemoryTicketStore::new();
        store.insert_available(EventId::new(1), 2).await.unwrap();

        let first = store.claim_available(EventId::new(1), "a", expiry()).await.unwrap();
        let second = store.claim_available(EventId::new(1), "b", expiry()).await.unwrap();
        let third = store.claim_available(EventId::new(1), "c", expiry()).await.unwrap();

        assert_eq!(first, Some(TicketId::new(1)));
        assert_eq!(second, Some(TicketId::new(2)));
        assert_eq!(third, None);

        let held = store.find(TicketId::new(2)).await.unwrap().unwrap();
        assert_eq!(held.status, TicketStatus::Held);
        assert_eq!(held.held_by.as_deref(), Some("b"));
        assert_eq!(held.held_until, Some(expiry()));
    }

    #[tokio::test]
    async fn late_inserts_are_claimable_after_exhaustion() {
        let store = InMemoryTicketStore::new();
        store.insert_available(EventId::new(1), 1).await.unwrap();
        store.claim_available(EventId::new(1), "a", expiry()).await.unwrap();
        assert_eq!(store.claim_available(EventId::new(1), "b", expiry()).await.unwrap(), None);

        store.insert_available(EventId::new(1), 1).await.unwrap();
        assert_eq!(
            store.claim_available(EventId::new(1), "b", expiry()).await.unwrap(),
            Some(TicketId::new(2))
        );
    }

    #[tokio::test]
    async fn counts_reflect_claims() {
        let store = InMemoryTicketStore::new();
        store.insert_available(EventId::new(1), 5).await.unwrap();
        store.claim_available(EventId::new(1), "a", expiry()).await.unwrap();

        let counts = store.count_by_status(EventId::new(1)).await.unwrap();
        assert_eq!(counts.available, 4);
        assert_eq!(counts.held, 1);
        assert_eq!(counts.total(), 5);
        assert_eq!(store.count_by_status(EventId::new(9)).await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn failing_store_fails_everything() {
        let store = FailingTicketStore::new("db down");
        assert!(matches!(
            store.claim_available(EventId::new(1), "a", expiry()).await,
            Err(StoreError::Connection(_))
        ));
        assert!(store.insert_available(EventId::new(1), 1).await.is_err());
        assert!(store.count_by_status(EventId::new(1)).await.is_err());
    }
}

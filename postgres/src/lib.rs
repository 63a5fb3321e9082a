//! `PostgreSQL` ticket store for the ticket allocator.
//!
//! This crate provides the production implementation of the `TicketStore`
//! trait from `ticket-core`. It relies on `PostgreSQL` row locking:
//!
//! - Claims are one `UPDATE ... FROM (SELECT ... FOR UPDATE SKIP LOCKED)` statement
//! - Seeding inserts a whole batch with one `INSERT ... SELECT generate_series`
//! - Schema is managed with `sqlx` migrations (`migrations/`)
//! - Connection pooling via `PgPool`
//!
//! # Example
//!
//! ```ignore
//! use ticket_postgres::PostgresTicketStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresTicketStore::new("postgres://localhost/tickets").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use ticket_core::store::{StoreError, TicketStore};
use ticket_core::types::{EventId, InventoryCounts, Ticket, TicketId, TicketStatus};

/// Select one claimable ticket, lock it without waiting on rows other
/// transactions hold, and mark it held, in a single statement.
const CLAIM_TICKET: &str = r"
WITH candidate AS (
    SELECT id
    FROM tickets
    WHERE event_id = $1 AND status = 'AVAILABLE'
    ORDER BY id
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
UPDATE tickets AS t
SET status = 'HELD', held_by = $2, held_until = $3
FROM candidate
WHERE t.id = candidate.id
RETURNING t.id
";

const INSERT_AVAILABLE: &str = r"
INSERT INTO tickets (event_id, status)
SELECT $1, 'AVAILABLE'
FROM generate_series(1, $2)
";

const FIND_TICKET: &str = r"
SELECT id, event_id, status, held_by, held_until
FROM tickets
WHERE id = $1
";

const COUNT_BY_STATUS: &str = r"
SELECT status, COUNT(*)
FROM tickets
WHERE event_id = $1
GROUP BY status
";

/// `PostgreSQL` SQLSTATE for a statement cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

/// PostgreSQL-backed ticket store.
///
/// Cloning shares the underlying connection pool.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tickets (
///     id BIGSERIAL PRIMARY KEY,
///     event_id BIGINT NOT NULL,
///     status TEXT NOT NULL DEFAULT 'AVAILABLE',
///     held_by TEXT,
///     held_until TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// CREATE INDEX idx_tickets_available ON tickets (event_id, id) WHERE status = 'AVAILABLE';
/// ```
#[derive(Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the database is unreachable.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        Self::connect(database_url, 10, Duration::from_secs(30)).await
    }

    /// Connect with an explicit pool size and acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] or [`StoreError::Timeout`] if the
    /// first connection cannot be established.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `tickets` table and its indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn claim(
        &self,
        event_id: EventId,
        owner: &str,
        held_until: DateTime<Utc>,
    ) -> Result<Option<TicketId>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar(CLAIM_TICKET)
            .bind(event_id.get())
            .bind(owner)
            .bind(held_until)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(id.map(TicketId::new))
    }

    async fn insert(&self, event_id: EventId, count: usize) -> Result<u64, StoreError> {
        if count == 0 {
            return Ok(0);
        }
        let count = i64::try_from(count)
            .map_err(|e| StoreError::Query(format!("Batch too large: {e}")))?;

        let result = sqlx::query(INSERT_AVAILABLE)
            .bind(event_id.get())
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn lookup(&self, ticket_id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row: Option<(i64, i64, String, Option<String>, Option<DateTime<Utc>>)> =
            sqlx::query_as(FIND_TICKET)
                .bind(ticket_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(|(id, event_id, status, held_by, held_until)| {
            Ok(Ticket {
                id: TicketId::new(id),
                event_id: EventId::new(event_id),
                status: parse_status(&status)?,
                held_by,
                held_until,
            })
        })
        .transpose()
    }

    async fn counts(&self, event_id: EventId) -> Result<InventoryCounts, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(COUNT_BY_STATUS)
            .bind(event_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut counts = InventoryCounts::default();
        for (status, n) in rows {
            #[allow(clippy::cast_sign_loss)] // COUNT(*) is never negative
            counts.add(parse_status(&status)?, n as u64);
        }
        Ok(counts)
    }
}

impl TicketStore for PostgresTicketStore {
    fn claim_available<'a>(
        &'a self,
        event_id: EventId,
        owner: &'a str,
        held_until: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TicketId>, StoreError>> + Send + 'a>> {
        Box::pin(self.claim(event_id, owner, held_until))
    }

    fn insert_available(
        &self,
        event_id: EventId,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(self.insert(event_id, count))
    }

    fn find(
        &self,
        ticket_id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(self.lookup(ticket_id))
    }

    fn count_by_status(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<InventoryCounts, StoreError>> + Send + '_>> {
        Box::pin(self.counts(event_id))
    }
}

fn parse_status(status: &str) -> Result<TicketStatus, StoreError> {
    status
        .parse()
        .map_err(|e| StoreError::Decode(format!("{e}")))
}

/// Sort a `sqlx` error into the store taxonomy.
fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut => {
            StoreError::Timeout("Timed out acquiring a connection".to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(error.to_string()),
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
            StoreError::Timeout(error.to_string())
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Decode(error.to_string()),
        other => {
            tracing::debug!(error = %other, "Unclassified database error");
            StoreError::Query(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        let mapped = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(mapped, StoreError::Timeout(_)));
        assert!(mapped.is_transient());
    }

    #[test]
    fn closed_pool_is_connection_error() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StoreError::Connection(_)
        ));
    }

    #[test]
    fn row_not_found_maps_to_query_error() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn unknown_status_is_decode_error() {
        assert!(matches!(parse_status("LOST"), Err(StoreError::Decode(_))));
        assert_eq!(parse_status("HELD").ok(), Some(TicketStatus::Held));
    }
}

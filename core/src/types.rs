//! Ticket identification, status and allocation types.
//!
//! This module defines strong types for ticket and event identification
//! (`TicketId`, `EventId`), the ticket lifecycle (`TicketStatus`) and the
//! request/result pair exchanged with the allocator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Requester recorded when the caller does not identify itself.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Default hold length in minutes.
pub const DEFAULT_HOLD_MINUTES: i64 = 15;

/// Longest hold a caller may ask for, in minutes (one week).
pub const MAX_HOLD_MINUTES: i64 = 7 * 24 * 60;

/// Convert a requested hold into a duration.
///
/// Returns `None` unless `minutes` is in `1..=MAX_HOLD_MINUTES`.
///
/// # Examples
///
/// ```
/// use ticket_core::types::{MAX_HOLD_MINUTES, hold_from_minutes};
///
/// assert!(hold_from_minutes(15).is_some());
/// assert!(hold_from_minutes(0).is_none());
/// assert!(hold_from_minutes(MAX_HOLD_MINUTES + 1).is_none());
/// ```
#[must_use]
pub fn hold_from_minutes(minutes: i64) -> Option<Duration> {
    if (1..=MAX_HOLD_MINUTES).contains(&minutes) {
        Duration::try_minutes(minutes)
    } else {
        None
    }
}

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

/// Identifier of the event a ticket pool belongs to.
///
/// # Examples
///
/// ```
/// use ticket_core::types::EventId;
///
/// let id: EventId = "42".parse().unwrap();
/// assert_eq!(id, EventId::new(42));
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Create an `EventId` from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            Ok(id) => Err(ParseIdError(format!("event id must be positive, got {id}"))),
            Err(e) => Err(ParseIdError(format!("{s:?}: {e}"))),
        }
    }
}

/// Identifier of a single ticket, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(i64);

impl TicketId {
    /// Create a `TicketId` from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for status parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown ticket status: {0}")]
pub struct ParseTicketStatusError(String);

/// Lifecycle state of a ticket.
///
/// Only `Available → Held` is performed by this crate. `Sold` and `Expired`
/// exist so stores can carry them without a schema change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Free to be allocated
    Available,
    /// Temporarily held by a requester until `held_until`
    Held,
    /// Sold (permanent)
    Sold,
    /// Hold lapsed and not yet reclaimed
    Expired,
}

impl TicketStatus {
    /// Storage representation (`AVAILABLE`, `HELD`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Held => "HELD",
            Self::Sold => "SOLD",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ParseTicketStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "HELD" => Ok(Self::Held),
            "SOLD" => Ok(Self::Sold),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(ParseTicketStatusError(other.to_string())),
        }
    }
}

/// A ticket as persisted by a [`TicketStore`](crate::store::TicketStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier, immutable
    pub id: TicketId,
    /// Pool this ticket belongs to, immutable
    pub event_id: EventId,
    /// Current lifecycle state
    pub status: TicketStatus,
    /// Requester holding the ticket (only while `Held`)
    pub held_by: Option<String>,
    /// When the hold lapses (only while `Held`)
    pub held_until: Option<DateTime<Utc>>,
}

impl Ticket {
    /// A freshly seeded ticket.
    #[must_use]
    pub const fn available(id: TicketId, event_id: EventId) -> Self {
        Self {
            id,
            event_id,
            status: TicketStatus::Available,
            held_by: None,
            held_until: None,
        }
    }
}

/// Per-status ticket counts for one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCounts {
    /// Tickets still `AVAILABLE`
    pub available: u64,
    /// Tickets `HELD`
    pub held: u64,
    /// Tickets `SOLD`
    pub sold: u64,
    /// Tickets `EXPIRED`
    pub expired: u64,
}

impl InventoryCounts {
    /// Total number of tickets seeded for the event.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.available + self.held + self.sold + self.expired
    }

    /// Add `n` tickets in `status`.
    pub const fn add(&mut self, status: TicketStatus, n: u64) {
        match status {
            TicketStatus::Available => self.available += n,
            TicketStatus::Held => self.held += n,
            TicketStatus::Sold => self.sold += n,
            TicketStatus::Expired => self.expired += n,
        }
    }
}

/// A validated request to hold one ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Pool to allocate from
    pub event_id: EventId,
    /// Recorded as the ticket's holder
    pub requester_id: String,
    /// Length of the hold, always positive
    pub hold_duration: Duration,
}

impl AllocationRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(
        event_id: EventId,
        requester_id: impl Into<String>,
        hold_duration: Duration,
    ) -> Self {
        Self {
            event_id,
            requester_id: requester_id.into(),
            hold_duration,
        }
    }
}

/// Defaults an adapter applies to incomplete requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationDefaults {
    /// Event used when the caller names none
    pub event_id: EventId,
    /// Requester used when the caller is anonymous
    pub requester_id: String,
    /// Hold used when the caller asks for a non-positive one
    pub hold_duration: Duration,
}

impl Default for AllocationDefaults {
    fn default() -> Self {
        Self {
            event_id: EventId::new(1),
            requester_id: ANONYMOUS_REQUESTER.to_string(),
            hold_duration: Duration::minutes(DEFAULT_HOLD_MINUTES),
        }
    }
}

impl AllocationDefaults {
    /// Build a request, filling in whatever the caller left out.
    ///
    /// `event_id` of `None` or `0`, an empty requester, and a non-positive
    /// hold all fall back to the defaults. A hold above [`MAX_HOLD_MINUTES`]
    /// is capped; adapters that want to reject it check
    /// [`hold_from_minutes`] first.
    #[must_use]
    pub fn apply(
        &self,
        event_id: Option<i64>,
        requester_id: Option<String>,
        hold_minutes: Option<i64>,
    ) -> AllocationRequest {
        let event_id = match event_id {
            None | Some(0) => self.event_id,
            Some(id) => EventId::new(id),
        };
        let requester_id = requester_id
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.requester_id.clone());
        let hold_duration = match hold_minutes {
            Some(minutes) if minutes > 0 => {
                hold_from_minutes(minutes.min(MAX_HOLD_MINUTES)).unwrap_or(self.hold_duration)
            }
            _ => self.hold_duration,
        };

        AllocationRequest {
            event_id,
            requester_id,
            hold_duration,
        }
    }
}

/// Outcome of a successful allocator call.
///
/// `SoldOut` is an expected result, not an error: it covers both true
/// exhaustion and every remaining candidate being locked by a competitor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// A ticket was moved to `HELD` for the requester.
    Held {
        /// The held ticket
        ticket_id: TicketId,
        /// When the hold lapses
        held_until: DateTime<Utc>,
    },
    /// No ticket of the event could be claimed.
    SoldOut,
}

impl Allocation {
    /// The held ticket, if any.
    #[must_use]
    pub const fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::Held { ticket_id, .. } => Some(*ticket_id),
            Self::SoldOut => None,
        }
    }

    /// Whether the pool was exhausted.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        matches!(self, Self::SoldOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_storage_text() {
        for status in [
            TicketStatus::Available,
            TicketStatus::Held,
            TicketStatus::Sold,
            TicketStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("available".parse::<TicketStatus>().is_err());
        assert!("RESERVED".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_storage_text() {
        let json = serde_json::to_string(&TicketStatus::Held).unwrap();
        assert_eq!(json, "\"HELD\"");
    }

    #[test]
    fn event_id_parse_rejects_non_positive() {
        assert_eq!("7".parse::<EventId>(), Ok(EventId::new(7)));
        assert!("0".parse::<EventId>().is_err());
        assert!("-3".parse::<EventId>().is_err());
        assert!("seven".parse::<EventId>().is_err());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let defaults = AllocationDefaults::default();
        let request = defaults.apply(None, None, None);

        assert_eq!(request.event_id, EventId::new(1));
        assert_eq!(request.requester_id, ANONYMOUS_REQUESTER);
        assert_eq!(request.hold_duration, Duration::minutes(15));
    }

    #[test]
    fn defaults_replace_zero_event_and_non_positive_hold() {
        let defaults = AllocationDefaults::default();
        let request = defaults.apply(Some(0), Some("   ".to_string()), Some(-5));

        assert_eq!(request.event_id, EventId::new(1));
        assert_eq!(request.requester_id, ANONYMOUS_REQUESTER);
        assert_eq!(request.hold_duration, Duration::minutes(15));
    }

    #[test]
    fn explicit_fields_are_kept() {
        let defaults = AllocationDefaults::default();
        let request = defaults.apply(Some(9), Some("alice".to_string()), Some(3));

        assert_eq!(request, AllocationRequest::new(EventId::new(9), "alice", Duration::minutes(3)));
    }

    #[test]
    fn oversized_hold_is_capped() {
        let defaults = AllocationDefaults::default();
        let max = Duration::minutes(MAX_HOLD_MINUTES);

        assert_eq!(defaults.apply(None, None, Some(i64::MAX)).hold_duration, max);
        assert_eq!(defaults.apply(None, None, Some(1_000_000_000_000)).hold_duration, max);
        assert_eq!(defaults.apply(None, None, Some(MAX_HOLD_MINUTES)).hold_duration, max);
    }

    #[test]
    fn hold_bounds() {
        assert_eq!(hold_from_minutes(1), Some(Duration::minutes(1)));
        assert_eq!(hold_from_minutes(MAX_HOLD_MINUTES), Some(Duration::minutes(MAX_HOLD_MINUTES)));
        assert_eq!(hold_from_minutes(MAX_HOLD_MINUTES + 1), None);
        assert_eq!(hold_from_minutes(0), None);
        assert_eq!(hold_from_minutes(i64::MIN), None);
        assert_eq!(hold_from_minutes(i64::MAX), None);
    }

    #[test]
    fn inventory_counts_total() {
        let mut counts = InventoryCounts::default();
        counts.add(TicketStatus::Available, 7);
        counts.add(TicketStatus::Held, 3);
        assert_eq!(counts.total(), 10);
        assert_eq!(counts.available, 7);
    }
}

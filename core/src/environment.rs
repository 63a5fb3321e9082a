//! Injected environment dependencies.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Hold expiries are computed from this, so tests can pin them with a fixed clock.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! # Ticket Load Generator
//!
//! Fires a fixed number of `POST /sell` requests at a target URL while never
//! having more than `concurrency` of them outstanding, then reports how many
//! succeeded and how fast.
//!
//! ## Concurrency
//!
//! A permit is taken from a [`Semaphore`] *before* each request task is
//! spawned and travels with the task, so the spawn loop itself stalls once
//! `concurrency` requests are in flight. Outcome counters are plain atomics.
//!
//! ## Example
//!
//! ```ignore
//! use ticket_loadgen::{LoadConfig, LoadGenerator};
//!
//! let config = LoadConfig {
//!     target: "http://localhost:8080/sell".to_string(),
//!     concurrency: 64,
//!     total: 10_000,
//!     ..LoadConfig::default()
//! };
//! let report = LoadGenerator::new(config)?.run().await;
//! println!("{report}");
//! ```

use reqwest::{Client, Url};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Target used when none is configured.
pub const DEFAULT_TARGET: &str = "http://localhost:8080/sell";

/// Requests fired when none is configured.
pub const DEFAULT_TOTAL: u64 = 1000;

/// Per-request client timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors building a [`LoadGenerator`].
///
/// A run itself never fails: every request outcome is counted instead.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The target is not an absolute URL.
    #[error("Invalid target URL {target}: {reason}")]
    InvalidTarget {
        /// The rejected target
        target: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Load test parameters.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Sell endpoint URL
    pub target: String,
    /// Maximum outstanding requests (0 is treated as 1)
    pub concurrency: usize,
    /// Requests to fire
    pub total: u64,
    /// `event_id` sent with every request
    pub event_id: i64,
    /// `hold_minutes` sent with every request
    pub hold_minutes: i64,
    /// Client timeout applied to each request
    pub request_timeout: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            concurrency: default_concurrency(),
            total: DEFAULT_TOTAL,
            event_id: 1,
            hold_minutes: 15,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Number of CPUs available to this process, or 1 if unknown.
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Outcome of a load test run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    /// Requests answered with a 2xx status
    pub success: u64,
    /// Everything else: non-2xx, transport errors, timeouts, panicked tasks
    pub failure: u64,
    /// Wall time from the first spawn to the last completion
    pub elapsed: Duration,
    /// Highest number of simultaneously outstanding requests observed
    pub peak_in_flight: u64,
}

impl LoadReport {
    /// Requests accounted for.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.success + self.failure
    }

    /// Successful requests per second of wall time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Counts far below 2^52
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.success as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Load test completed. Success={}, Failed={}, elapsed={:?}, throughput={:.2} req/s",
            self.success,
            self.failure,
            self.elapsed,
            self.throughput()
        )
    }
}

/// Body of each generated request.
#[derive(Debug, Serialize)]
struct SellBody {
    event_id: i64,
    user_id: String,
    hold_minutes: i64,
}

#[derive(Debug, Default)]
struct Counters {
    success: AtomicU64,
    failure: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl Counters {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    fn leave(&self, ok: bool) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if ok {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Bounded-concurrency request driver.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    client: Client,
    target: Url,
    concurrency: usize,
    total: u64,
    event_id: i64,
    hold_minutes: i64,
}

impl LoadGenerator {
    /// Validate the target and build the HTTP client.
    ///
    /// # Errors
    ///
    /// - [`LoadError::InvalidTarget`] if `config.target` does not parse
    /// - [`LoadError::Client`] if the TLS backend cannot be initialised
    pub fn new(config: LoadConfig) -> Result<Self, LoadError> {
        let target = Url::parse(&config.target).map_err(|e| LoadError::InvalidTarget {
            target: config.target.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            target,
            concurrency: config.concurrency.max(1),
            total: config.total,
            event_id: config.event_id,
            hold_minutes: config.hold_minutes,
        })
    }

    /// Effective concurrency bound.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fire `total` requests and wait for all of them.
    ///
    /// Always returns with `success + failure == total`.
    pub async fn run(&self) -> LoadReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let counters = Arc::new(Counters::default());
        let mut tasks = JoinSet::new();

        tracing::info!(
            target_url = %self.target,
            concurrency = self.concurrency,
            total = self.total,
            "Starting load test"
        );
        let started = Instant::now();

        for i in 0..self.total {
            // The semaphore is never closed, so acquisition only fails if
            // that invariant is broken; count it rather than abort the run.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                counters.failure.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            let client = self.client.clone();
            let target = self.target.clone();
            let counters = Arc::clone(&counters);
            let body = SellBody {
                event_id: self.event_id,
                user_id: format!("loadtest-{i}"),
                hold_minutes: self.hold_minutes,
            };

            tasks.spawn(async move {
                counters.enter();
                let ok = send(&client, target, &body).await;
                counters.leave(ok);
                drop(permit);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Load test request task failed");
                counters.failure.fetch_add(1, Ordering::Relaxed);
            }
        }

        let report = LoadReport {
            success: counters.success.load(Ordering::Acquire),
            failure: counters.failure.load(Ordering::Acquire),
            elapsed: started.elapsed(),
            peak_in_flight: counters.peak_in_flight.load(Ordering::Acquire),
        };

        tracing::info!(
            success = report.success,
            failure = report.failure,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            peak_in_flight = report.peak_in_flight,
            "Load test finished"
        );
        report
    }
}

/// Send one request. `true` only for a 2xx whose body was fully read.
async fn send(client: &Client, target: Url, body: &SellBody) -> bool {
    match client.post(target).json(body).send().await {
        Ok(response) => {
            let status = response.status();
            let drained = response.bytes().await.is_ok();
            if !status.is_success() {
                tracing::debug!(status = %status, user_id = %body.user_id, "Request rejected");
            }
            status.is_success() && drained
        }
        Err(e) => {
            tracing::debug!(error = %e, user_id = %body.user_id, "Request failed");
            false
        }
    }
}

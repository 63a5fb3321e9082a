//! Metrics for the ticketing service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `tickets_allocations_total{outcome}` - Allocation calls by outcome (held, sold_out, error)
//! - `tickets_seeded_total` - Tickets created by the seeder
//!
//! ## Histograms
//! - `tickets_allocation_duration_seconds` - Time spent in one allocation call

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Register all metric descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(
        "tickets_allocations_total",
        "Total number of allocation calls by outcome (held, sold_out, error)"
    );
    describe_histogram!(
        "tickets_allocation_duration_seconds",
        "Time taken by one allocation call, including the store round trip"
    );
    describe_counter!("tickets_seeded_total", "Total number of tickets created by seeding");

    tracing::info!("Ticket metrics registered");
}

/// Install the Prometheus exporter with its own HTTP listener.
///
/// # Errors
///
/// Returns an error if the recorder is already installed or the listener
/// cannot bind.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter on {addr}: {e}"))?;

    tracing::info!(%addr, "Prometheus metrics available at /metrics");
    Ok(())
}

//! Run modes: seed, serve and loadtest.

use crate::cli::StoreKind;
use crate::config::{Config, PostgresConfig};
use crate::server::{serve_until, shutdown_signal};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use ticket_core::seeder::DEFAULT_BATCH_SIZE;
use ticket_core::types::EventId;
use ticket_core::{Allocator, SeedReport, Seeder, SystemClock, TicketStore};
use ticket_loadgen::{DEFAULT_TARGET, LoadConfig, LoadGenerator, LoadReport, default_concurrency};
use ticket_postgres::PostgresTicketStore;
use ticket_testing::InMemoryTicketStore;
use ticket_web::AppState;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Options of the `loadtest` mode.
#[derive(Debug, Clone)]
pub struct LoadtestOptions {
    /// Explicit target; `None` picks one from `serve`
    pub url: Option<String>,
    /// Outstanding request bound; `None` means one per CPU
    pub concurrency: Option<usize>,
    /// Requests to fire
    pub requests: u64,
    /// Event to buy from
    pub event_id: i64,
    /// Hold length sent with each request
    pub hold_minutes: i64,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Tickets to seed before firing
    pub seed: Option<usize>,
    /// Start the HTTP server in this process first
    pub serve: bool,
}

/// Open the configured ticket store.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn open_store(
    kind: StoreKind,
    migrate: bool,
    postgres: &PostgresConfig,
) -> anyhow::Result<Arc<dyn TicketStore>> {
    match kind {
        StoreKind::Postgres => {
            info!(max_connections = postgres.max_connections, "Connecting to ticket database...");
            let store = PostgresTicketStore::connect(
                &postgres.url,
                postgres.max_connections,
                postgres.acquire_timeout(),
            )
            .await
            .context("Failed to connect to ticket database")?;
            info!("Ticket database connected");

            if migrate {
                store.migrate().await.context("Failed to run migrations")?;
                info!("Migrations applied");
            }
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            info!("Using in-memory ticket store");
            Ok(Arc::new(InMemoryTicketStore::new()))
        }
    }
}

/// Seed `count` tickets for `event_id`.
///
/// # Errors
///
/// Returns an error if the event id is invalid or a batch fails.
pub async fn seed(
    store: Arc<dyn TicketStore>,
    event_id: i64,
    count: usize,
    batch_size: usize,
) -> anyhow::Result<SeedReport> {
    let event_id = positive_event(event_id)?;
    let report = Seeder::new(store)
        .with_batch_size(batch_size)
        .seed(event_id, count)
        .await?;
    Ok(report)
}

/// Build the shared HTTP state over `store`.
#[must_use]
pub fn app_state(store: Arc<dyn TicketStore>, config: &Config) -> AppState {
    let allocator = Allocator::new(store, Arc::new(SystemClock));
    AppState::new(allocator, config.allocation_defaults())
}

/// Serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    store: Arc<dyn TicketStore>,
    config: &Config,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut addr = config.server.bind_addr()?;
    if let Some(port) = port {
        addr.set_port(port);
    }
    let listener = bind(addr).await?;

    serve_until(
        listener,
        app_state(store, config),
        shutdown_signal(),
        config.server.shutdown_timeout(),
    )
    .await
}

/// Run a load test, optionally against a server started in this process.
///
/// `store` is only needed to seed or to serve; a run against a remote
/// server may pass `None`. The in-process server is listening before the
/// first request is sent and is stopped once the run completes.
///
/// # Errors
///
/// Returns an error if a store is needed but missing, seeding fails, the
/// server cannot bind, or the target URL is invalid. Individual request
/// failures are counted, not returned.
pub async fn loadtest(
    store: Option<Arc<dyn TicketStore>>,
    config: &Config,
    options: LoadtestOptions,
) -> anyhow::Result<LoadReport> {
    if let Some(count) = options.seed {
        let store = store.clone().context("Seeding requires a ticket store")?;
        let report = seed(store, options.event_id, count, DEFAULT_BATCH_SIZE).await?;
        info!(inserted = report.inserted, "Seeded tickets for load test");
    }

    let mut server = None;
    let target = if options.serve {
        let listener = bind(config.server.bind_addr()?).await?;
        let local = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let store = store.context("Serving requires a ticket store")?;
        let state = app_state(store, config);
        let grace = config.server.shutdown_timeout();
        let handle = tokio::spawn(async move {
            let stopped = async {
                let _ = stop_rx.await;
            };
            serve_until(listener, state, stopped, grace).await
        });
        server = Some((stop_tx, handle));
        options.url.unwrap_or_else(|| local_target(local))
    } else {
        options.url.unwrap_or_else(|| DEFAULT_TARGET.to_string())
    };

    let generator = LoadGenerator::new(LoadConfig {
        target,
        concurrency: options.concurrency.unwrap_or_else(default_concurrency),
        total: options.requests,
        event_id: options.event_id,
        hold_minutes: options.hold_minutes,
        request_timeout: options.request_timeout,
    })?;
    let report = generator.run().await;

    if let Some((stop_tx, handle)) = server {
        let _ = stop_tx.send(());
        match handle.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "In-process server task failed"),
        }
    }

    Ok(report)
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))
}

/// URL of the sell endpoint on a locally bound listener.
fn local_target(local: SocketAddr) -> String {
    let host = if local.ip().is_unspecified() {
        "127.0.0.1".to_string()
    } else {
        local.ip().to_string()
    };
    let port = local.port();
    if local.is_ipv6() && !local.ip().is_unspecified() {
        format!("http://[{host}]:{port}/sell")
    } else {
        format!("http://{host}:{port}/sell")
    }
}

fn positive_event(event_id: i64) -> anyhow::Result<EventId> {
    anyhow::ensure!(event_id > 0, "event id must be positive, got {event_id}");
    Ok(EventId::new(event_id))
}

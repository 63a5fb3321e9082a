//! Ticketing service entry point.

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use ticketing::app::{self, LoadtestOptions};
use ticketing::cli::{Cli, Command, StoreKind};
use ticketing::config::Config;
use ticketing::metrics;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticketing=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();
    config.validate()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        store = ?cli.store,
        "Configuration loaded"
    );

    metrics::register_metrics();
    if matches!(cli.command, Command::Serve { .. }) {
        if let Some(addr) = config.server.metrics_addr()? {
            metrics::install_exporter(addr)?;
        }
    }

    if cli.migrate && cli.store == StoreKind::Memory {
        warn!("--migrate has no effect on the in-memory store");
    }
    // A load test against a remote server never touches the store.
    let store = match &cli.command {
        Command::Loadtest {
            no_serve: true,
            seed: None,
            ..
        } => None,
        _ => Some(app::open_store(cli.store, cli.migrate, &config.postgres).await?),
    };

    match cli.command {
        Command::Seed {
            event,
            count,
            batch_size,
        } => {
            if cli.store == StoreKind::Memory {
                warn!("Seeding the in-memory store; tickets are discarded on exit");
            }
            let store = store.context("store not opened")?;
            let report = app::seed(store, event, count, batch_size).await?;
            info!(
                event_id = %report.event_id,
                inserted = report.inserted,
                batches = report.batches,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Seeding completed"
            );
        }
        Command::Serve { port } => {
            let store = store.context("store not opened")?;
            info!("Starting ticket server");
            app::serve(store, &config, port).await?;
        }
        Command::Loadtest {
            url,
            concurrency,
            requests,
            event,
            hold_minutes,
            timeout_secs,
            seed,
            no_serve,
        } => {
            let options = LoadtestOptions {
                url,
                concurrency,
                requests,
                event_id: event,
                hold_minutes,
                request_timeout: Duration::from_secs(timeout_secs),
                seed,
                serve: !no_serve,
            };
            let report = app::loadtest(store, &config, options).await?;
            println!("{report}");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

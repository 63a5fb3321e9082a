//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use ticket_core::seeder::DEFAULT_BATCH_SIZE;
use ticket_loadgen::DEFAULT_TOTAL;

/// Ticket selling service.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Ticket store backend
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres, global = true)]
    pub store: StoreKind,

    /// Apply database migrations before running
    #[arg(long, global = true)]
    pub migrate: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Ticket store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// `PostgreSQL` with skip-locked claims
    Postgres,
    /// Process-local store; contents are lost on exit
    Memory,
}

/// Run mode.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create AVAILABLE tickets for an event
    Seed {
        /// Event to seed
        #[arg(long, default_value_t = 1)]
        event: i64,
        /// Tickets to create
        #[arg(long, default_value_t = 100_000)]
        count: usize,
        /// Rows per insert round trip
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Run the HTTP server
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Fire sell requests and report throughput
    Loadtest {
        /// Sell endpoint [default: the in-process server, or
        /// http://localhost:8080/sell with --no-serve]
        #[arg(long)]
        url: Option<String>,
        /// Maximum outstanding requests (defaults to the CPU count)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Requests to fire
        #[arg(long, default_value_t = DEFAULT_TOTAL)]
        requests: u64,
        /// Event to buy from
        #[arg(long, default_value_t = 1)]
        event: i64,
        /// Hold length sent with each request
        #[arg(long, default_value_t = 15)]
        hold_minutes: i64,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
        /// Seed this many tickets for the event before firing
        #[arg(long)]
        seed: Option<usize>,
        /// Target an already running server instead of starting one
        #[arg(long)]
        no_serve: bool,
    },
}

//! Ticket selling service.
//!
//! One binary, three modes:
//!
//! - `seed`: create AVAILABLE tickets for an event in batches
//! - `serve`: answer `POST /sell` by holding one ticket per request
//! - `loadtest`: fire concurrent sell requests and report throughput,
//!   by default against a server started in the same process
//!
//! # Architecture
//!
//! ```text
//!   ticketing (this crate)   CLI, configuration, metrics exporter, lifecycle
//!        │
//!        ├── ticket-web       axum router: /sell, /health, /ready
//!        ├── ticket-loadgen   bounded-concurrency HTTP client
//!        │
//!        └── ticket-core      Allocator, Seeder, TicketStore trait
//!               │
//!               ├── ticket-postgres   FOR UPDATE SKIP LOCKED claims
//!               └── ticket-testing    in-memory compare-and-swap store
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod metrics;
pub mod server;

pub use config::{Config, ConfigError};

//! # Ticket Core
//!
//! Domain types and the allocation contract for selling a strictly limited
//! pool of tickets to concurrently competing callers.
//!
//! ## Core Concepts
//!
//! - **Ticket**: a uniquely identified unit of inventory belonging to one event
//! - **`TicketStore`**: the durable store capability (atomic claim, batched insert)
//! - **Allocator**: turns an [`AllocationRequest`](types::AllocationRequest) into an
//!   [`Allocation`](types::Allocation) with a single store round trip
//! - **Seeder**: bulk-creates `AVAILABLE` tickets in bounded batches
//! - **Clock**: injected time source so hold expiries are deterministic in tests
//!
//! ## Architecture Principles
//!
//! - No in-process locking: all coordination is delegated to the store
//! - Sold out is an outcome, not an error
//! - Dependencies are injected, never global
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ticket_core::allocator::Allocator;
//! use ticket_core::environment::SystemClock;
//! use ticket_core::types::{Allocation, AllocationRequest, EventId};
//!
//! let allocator = Allocator::new(store, Arc::new(SystemClock));
//! let request = AllocationRequest::new(EventId::new(1), "user-42", chrono::Duration::minutes(15));
//!
//! match allocator.allocate(&request).await? {
//!     Allocation::Held { ticket_id, .. } => println!("got {ticket_id}"),
//!     Allocation::SoldOut => println!("sold out"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocator;
pub mod environment;
pub mod seeder;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use allocator::{AllocateError, Allocator};
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use seeder::{SeedError, SeedReport, Seeder};
pub use store::{StoreError, TicketStore};
pub use types::{
    Allocation, AllocationDefaults, AllocationRequest, EventId, InventoryCounts, Ticket, TicketId,
    TicketStatus,
};

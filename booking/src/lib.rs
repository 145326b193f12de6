//! Event booking backend.
//!
//! Users create events with ticket tiers, admins moderate and publish them,
//! and anyone can book tickets for published, upcoming events. The system
//! guarantees that ticket inventory is never oversold and never goes
//! negative, even when many people book the last tickets at once.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)            api/, auth/, server/
//!        │
//!        ▼
//!   BookingService         app/   authorization, views, metrics
//!        │
//!        ▼
//!   Store<EventReducer>    load → reduce → compare-and-swap, retried on conflict
//!        │
//!        ▼
//!   AggregateStore         in-memory or PostgreSQL (JSONB + version column)
//! ```
//!
//! # Consistency
//!
//! An event document holds its ticket types, attendees and bookings, so one
//! booking is a single document write. The reducer runs against a loaded copy
//! and the copy is discarded on rejection, which makes every operation
//! all-or-nothing. Concurrent writers are serialised by a per-event lock and
//! an optimistic version check. A write that loses the race is re-run against
//! fresh state up to the configured retry budget.
//!
//! # Usage
//!
//! See [`app::BookingService`] for the operations and [`aggregates`] for the
//! reducer and its tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accounts;
pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod types;

pub use accounts::{Account, AccountDirectory, AuthError, InMemoryAccounts};
pub use aggregates::{EventAction, EventEnvironment, EventOutcome, EventReducer};
pub use app::BookingService;
pub use config::{Config, StorageBackend};
pub use error::{BookingError, Result};
pub use types::*;

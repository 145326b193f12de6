//! Aggregate reducers for the event booking backend.
//!
//! - [`event`]: event lifecycle and the booking workflow
//! - `ledger`: the inventory mutations the workflow is allowed to make
//! - [`analytics`]: read-only admin figures over a snapshot of events

pub mod analytics;
pub mod event;
mod ledger;
pub mod validation;

pub use analytics::{BookingBreakdown, DateRange};
pub use event::{
    EventAction, EventEnvironment, EventOutcome, EventReducer, check_delete, create_event,
};

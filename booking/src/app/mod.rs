//! Application service: the operations the HTTP layer calls.
//!
//! [`BookingService`] owns the event [`eventbook_runtime::Store`] and the
//! account directory. Writes go through the reducer runtime; reads take a
//! lock-free snapshot of the store.

mod service;
mod views;

pub use service::BookingService;
pub use views::{AttendeeView, BookingReceipt, CancellationReceipt, TicketView};

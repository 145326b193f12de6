//! API endpoints for the booking backend.
//!
//! Handlers are organised by audience:
//! - Events: browsing and managing events
//! - Bookings: booking and cancelling tickets
//! - Me: the caller's own events and bookings
//! - Admin: moderation and publication
//! - Analytics: admin reporting

pub mod admin;
pub mod analytics;
pub mod bookings;
pub mod events;
pub mod me;

pub use admin::{all_events, ban_user, event_attendees, pending_events, toggle_publish};
pub use bookings::{book_tickets, cancel_booking};
pub use events::{cancel_event, create_event, delete_event, get_event, list_events, update_event};
pub use me::{my_bookings, my_events};

//! Results returned by [`super::BookingService`] besides whole events.

use crate::types::{Booking, BookingId, BookingStatus, EventId, Money, PaymentStatus, TicketTypeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A successful booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    /// New booking
    pub booking_id: BookingId,
    /// Event it belongs to
    pub event_id: EventId,
    /// Inventory left on the ticket type
    pub tickets_remaining: u32,
}

/// A successful cancellation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReceipt {
    /// Cancelled booking
    pub booking_id: BookingId,
    /// Event it belongs to
    pub event_id: EventId,
    /// Refund owed, in cents
    pub refund_amount: Money,
}

/// One of the caller's bookings, with enough event context to display it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// Booking id
    pub booking_id: BookingId,
    /// Event id
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Event start
    pub event_start: DateTime<Utc>,
    /// Ticket type id
    pub ticket_type_id: TicketTypeId,
    /// Ticket type name; `None` if the type was removed from the event
    pub ticket_type_name: Option<String>,
    /// Number of tickets
    pub tickets: u32,
    /// Booking status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// When it was booked
    pub booked_at: DateTime<Utc>,
    /// When it was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Admin view of who is attending an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    /// Event id
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// Users holding at least one confirmed booking
    pub attendees: Vec<UserId>,
    /// `attendees.len()`
    pub attendee_count: u64,
    /// Soft cap
    pub max_attendees: u32,
    /// Every booking, including cancelled ones
    pub bookings: Vec<Booking>,
}

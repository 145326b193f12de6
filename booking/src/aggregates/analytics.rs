//! Admin analytics over a snapshot of events.
//!
//! Everything here is a pure function of the events it is handed: nothing is
//! cached and nothing is written back. The snapshot may be slightly stale,
//! which is fine for advisory figures.

use crate::types::{BookingStatus, Event, Money, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive window that an event must fall entirely inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest allowed start
    pub start: DateTime<Utc>,
    /// Latest allowed end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range; `None` if `start` is after `end`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `true` if the event starts and ends inside the range.
    #[must_use]
    pub fn contains(&self, event: &Event) -> bool {
        event.start_time() >= self.start && event.end_time() <= self.end
    }
}

/// Booking counts grouped by status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingBreakdown {
    /// Pending bookings
    pub pending: u64,
    /// Confirmed bookings
    pub confirmed: u64,
    /// Cancelled bookings
    pub cancelled: u64,
    /// All bookings
    pub total: u64,
}

fn in_scope<'a>(
    events: &'a [Event],
    range: Option<&'a DateRange>,
) -> impl Iterator<Item = &'a Event> + 'a {
    events
        .iter()
        .filter(|event| !event.is_cancelled())
        .filter(move |event| range.is_none_or(|range| range.contains(event)))
}

/// Sum of `tickets × price` over confirmed, paid bookings of non-cancelled
/// events in `range`. Bookings whose ticket type no longer exists count as 0.
#[must_use]
pub fn total_revenue(events: &[Event], range: &DateRange) -> Money {
    in_scope(events, Some(range))
        .flat_map(|event| {
            event
                .bookings()
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed && b.payment_status == PaymentStatus::Paid)
                .map(move |booking| {
                    event
                        .ticket_type(booking.ticket_type_id)
                        .map_or(Money::ZERO, |t| t.price.saturating_multiply(booking.tickets))
                })
        })
        .sum()
}

/// Distinct attendees summed over non-cancelled events in `range`.
#[must_use]
pub fn total_attendees(events: &[Event], range: &DateRange) -> u64 {
    in_scope(events, Some(range)).map(Event::attendee_count).sum()
}

/// Booking counts by status over non-cancelled events, optionally limited to
/// events inside `range`.
#[must_use]
pub fn booking_breakdown(events: &[Event], range: Option<&DateRange>) -> BookingBreakdown {
    in_scope(events, range)
        .flat_map(Event::bookings)
        .fold(BookingBreakdown::default(), |mut acc, booking| {
            match booking.status {
                BookingStatus::Pending => acc.pending += 1,
                BookingStatus::Confirmed => acc.confirmed += 1,
                BookingStatus::Cancelled => acc.cancelled += 1,
            }
            acc.total += 1;
            acc
        })
}

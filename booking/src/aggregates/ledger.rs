//! Inventory ledger: the only code that moves tickets in and out of a ticket
//! type's `available` counter.
//!
//! Both operations validate and mutate in one step against the event they are
//! given. The runtime hands them a private copy of the stored event and writes
//! it back only if nobody else wrote in between, so a check can never pass
//! against a stale counter.

use crate::error::{BookingError, Result};
use crate::types::{Booking, BookingId, BookingStatus, Event, Money, PaymentStatus, TicketTypeId, UserId};
use chrono::{DateTime, Utc};

/// A validated request to take tickets out of inventory.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Reservation {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub ticket_type_id: TicketTypeId,
    pub quantity: u64,
    pub at: DateTime<Utc>,
}

/// Result of a successful reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Reserved {
    pub tickets: u32,
    pub remaining: u32,
}

/// Take `quantity` tickets and record a confirmed, paid booking.
///
/// Checks, in order: ticket type exists, enough inventory, per-user cap.
pub(crate) fn reserve(event: &mut Event, request: Reservation) -> Result<Reserved> {
    let Some(index) = event
        .ticket_types
        .iter()
        .position(|t| t.id == request.ticket_type_id)
    else {
        return Err(BookingError::not_found("ticket type", request.ticket_type_id));
    };

    let (available, max_per_user) = {
        let ticket_type = &event.ticket_types[index];
        (ticket_type.available, ticket_type.max_per_user)
    };

    let tickets = match u32::try_from(request.quantity) {
        Ok(tickets) if tickets <= available => tickets,
        _ => {
            return Err(BookingError::InsufficientInventory {
                requested: request.quantity,
                available,
            });
        }
    };

    let already_held = event.confirmed_tickets(request.user_id, request.ticket_type_id);
    if u64::from(already_held) + request.quantity > u64::from(max_per_user) {
        return Err(BookingError::QuotaExceeded {
            requested: request.quantity,
            already_held,
            max_per_user,
        });
    }

    let remaining = available - tickets;
    event.ticket_types[index].available = remaining;
    event.bookings.push(Booking {
        id: request.booking_id,
        user_id: request.user_id,
        ticket_type_id: request.ticket_type_id,
        tickets,
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
        booked_at: request.at,
        cancelled_at: None,
    });
    if !event.attendees.contains(&request.user_id) {
        event.attendees.push(request.user_id);
    }
    event.updated_at = request.at;

    Ok(Reserved { tickets, remaining })
}

/// Cancel a booking and put its tickets back.
///
/// Inventory is restored only if the ticket type still exists on the event;
/// otherwise the release is a no-op and the refund is zero. Returns the refund.
pub(crate) fn release(event: &mut Event, booking_id: BookingId, at: DateTime<Utc>) -> Result<Money> {
    let Some(index) = event.bookings.iter().position(|b| b.id == booking_id) else {
        return Err(BookingError::not_found("booking", booking_id));
    };

    let booking = &mut event.bookings[index];
    if booking.status == BookingStatus::Cancelled {
        return Err(BookingError::invalid_state("Booking is already cancelled"));
    }
    booking.status = BookingStatus::Cancelled;
    booking.cancelled_at = Some(at);
    let (user_id, ticket_type_id, tickets) = (booking.user_id, booking.ticket_type_id, booking.tickets);

    let refund = match event.ticket_types.iter_mut().find(|t| t.id == ticket_type_id) {
        Some(ticket_type) => {
            ticket_type.available = ticket_type.available.saturating_add(tickets);
            ticket_type.price.saturating_multiply(tickets)
        }
        None => {
            tracing::debug!(%booking_id, %ticket_type_id, "Ticket type no longer exists; nothing to restore");
            Money::ZERO
        }
    };

    let still_attending = event
        .bookings
        .iter()
        .any(|b| b.user_id == user_id && b.is_confirmed());
    if !still_attending {
        event.attendees.retain(|attendee| *attendee != user_id);
    }
    event.updated_at = at;

    Ok(refund)
}

//! Event aggregate: lifecycle, editing and the booking workflow.
//!
//! Every mutation of an event, including booking and cancelling tickets, goes
//! through [`EventReducer`]. The runtime loads the stored event, runs the
//! reducer against a private copy and saves it with a version check, so each
//! action is all-or-nothing with respect to the stored document.

use crate::aggregates::{ledger, validation};
use crate::error::{BookingError, Result};
use crate::types::{
    Actor, BookingId, Event, EventDraft, EventId, EventPatch, Money, PublicationState,
    TicketType, TicketTypeDraft, TicketTypeId, UserId,
};
use chrono::{DateTime, Utc};
use eventbook_core::environment::Clock;
use eventbook_core::reducer::Reducer;
use std::sync::Arc;

// ============================================================================
// Actions
// ============================================================================

/// Changes that can be requested on an existing event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// Edit details, schedule or ticket types (creator or admin)
    Update {
        /// Who is editing
        actor: Actor,
        /// Fields to change
        patch: EventPatch,
        /// Ids for the tiers the patch adds, in order
        new_ticket_type_ids: Vec<TicketTypeId>,
    },

    /// Flip between Draft and Published (admin only)
    TogglePublish {
        /// Who is toggling
        actor: Actor,
    },

    /// Cancel the event (creator or admin)
    Cancel {
        /// Who is cancelling
        actor: Actor,
        /// Optional reason shown to attendees
        reason: Option<String>,
    },

    /// Reserve tickets of one type
    Book {
        /// Id for the new booking, chosen by the caller
        booking_id: BookingId,
        /// Who is booking
        user_id: UserId,
        /// Which tier
        ticket_type_id: TicketTypeId,
        /// Requested quantity, exactly as received
        quantity: i64,
    },

    /// Cancel one of the caller's bookings
    CancelBooking {
        /// Booking to cancel
        booking_id: BookingId,
        /// Who is cancelling
        user_id: UserId,
    },
}

impl EventAction {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::TogglePublish { .. } => "toggle_publish",
            Self::Cancel { .. } => "cancel",
            Self::Book { .. } => "book",
            Self::CancelBooking { .. } => "cancel_booking",
        }
    }
}

/// What an accepted action produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event after an update, publish toggle or cancellation
    Event(Box<Event>),

    /// Tickets were reserved
    Booked {
        /// New booking
        booking_id: BookingId,
        /// Tickets reserved
        tickets: u32,
        /// Inventory left on the ticket type
        tickets_remaining: u32,
    },

    /// A booking was cancelled and its tickets returned
    BookingCancelled {
        /// Cancelled booking
        booking_id: BookingId,
        /// Amount to refund (zero if the ticket type was removed)
        refund: Money,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Event aggregate
#[derive(Clone)]
pub struct EventEnvironment {
    /// Clock for timestamps and "has it started yet" checks
    pub clock: Arc<dyn Clock>,
}

impl EventEnvironment {
    /// Creates a new `EventEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Creation and deletion
// ============================================================================

/// Build a new event from a validated draft.
///
/// The event is published straight away only when an admin asks for it;
/// everyone else gets a draft.
///
/// # Errors
///
/// [`BookingError::InvalidInput`] when any field fails validation.
pub fn create_event(id: EventId, actor: Actor, draft: EventDraft, now: DateTime<Utc>) -> Result<Event> {
    validate_draft(&draft, now)?;

    let state = if draft.publish && actor.is_admin() {
        PublicationState::Published
    } else {
        PublicationState::Draft
    };

    Ok(Event {
        id,
        title: draft.title,
        description: draft.description,
        category: draft.category,
        kind: draft.kind,
        location: draft.location,
        start_time: draft.start_time,
        end_time: draft.end_time,
        max_attendees: draft.max_attendees,
        attendees: Vec::new(),
        ticket_types: draft
            .ticket_types
            .into_iter()
            .map(TicketTypeDraft::into_ticket_type)
            .collect(),
        bookings: Vec::new(),
        created_by: actor.user_id,
        state,
        is_featured: draft.is_featured,
        cancellation_reason: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Whether `actor` may delete `event` right now.
///
/// # Errors
///
/// [`BookingError::Forbidden`] for anyone but the creator or an admin,
/// [`BookingError::InvalidState`] while anyone still holds tickets.
pub fn check_delete(event: &Event, actor: &Actor) -> Result<()> {
    if !actor.can_manage(event) {
        return Err(BookingError::forbidden("Not authorized to delete this event"));
    }
    if !event.attendees.is_empty() {
        return Err(BookingError::invalid_state(
            "Cannot delete an event that has attendees; cancel it instead",
        ));
    }
    Ok(())
}

fn validate_draft(draft: &EventDraft, now: DateTime<Utc>) -> Result<()> {
    validation::text("Title", &draft.title, Some(validation::MAX_TITLE_CHARS))?;
    validation::text(
        "Description",
        &draft.description,
        Some(validation::MAX_DESCRIPTION_CHARS),
    )?;
    validation::text("Category", &draft.category, None)?;
    validation::text("Type", &draft.kind, None)?;
    validation::text("Location", &draft.location, None)?;
    validation::max_attendees(draft.max_attendees)?;
    validation::schedule(draft.start_time, draft.end_time, now, true)?;
    validation::ticket_types(&draft.ticket_types)
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Event aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct EventReducer;

impl EventReducer {
    /// Creates a new `EventReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Replacement tier list for an edit.
    ///
    /// Drafts without an id take the next minted id. A draft that names an
    /// id must name one of the event's current tiers. A kept tier cannot cap
    /// buyers below what someone already holds on it.
    fn replace_ticket_types(
        event: &Event,
        drafts: Vec<TicketTypeDraft>,
        minted: Vec<TicketTypeId>,
    ) -> Result<Vec<TicketType>> {
        validation::ticket_types(&drafts)?;

        let mut minted = minted.into_iter();
        let mut ticket_types = Vec::with_capacity(drafts.len());
        for mut draft in drafts {
            match draft.id {
                Some(id) if event.ticket_type(id).is_none() => {
                    return Err(BookingError::invalid_input(format!(
                        "Unknown ticket type id {id}"
                    )));
                }
                Some(id) => {
                    let held = event.largest_holding(id);
                    if draft.max_per_user < held {
                        return Err(BookingError::invalid_state(format!(
                            "Ticket type '{}' cannot allow fewer than {held} tickets per user, \
                             an attendee already holds that many",
                            draft.name
                        )));
                    }
                }
                None => draft.id = Some(minted.next().unwrap_or_default()),
            }
            ticket_types.push(draft.into_ticket_type());
        }
        Ok(ticket_types)
    }

    fn update(
        event: &mut Event,
        actor: &Actor,
        mut patch: EventPatch,
        new_ticket_type_ids: Vec<TicketTypeId>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !actor.can_manage(event) {
            return Err(BookingError::forbidden("Not authorized to edit this event"));
        }
        if event.is_cancelled() {
            return Err(BookingError::invalid_state("Cannot edit a cancelled event"));
        }

        // Edited tiers replace the old list wholesale. Bookings on a dropped
        // tier stay as they are and are refunded nothing if cancelled.
        let ticket_types = patch
            .ticket_types
            .take()
            .map(|drafts| Self::replace_ticket_types(event, drafts, new_ticket_type_ids))
            .transpose()?;

        if let Some(title) = patch.title {
            validation::text("Title", &title, Some(validation::MAX_TITLE_CHARS))?;
            event.title = title;
        }
        if let Some(description) = patch.description {
            validation::text(
                "Description",
                &description,
                Some(validation::MAX_DESCRIPTION_CHARS),
            )?;
            event.description = description;
        }
        if let Some(category) = patch.category {
            validation::text("Category", &category, None)?;
            event.category = category;
        }
        if let Some(kind) = patch.kind {
            validation::text("Type", &kind, None)?;
            event.kind = kind;
        }
        if let Some(location) = patch.location {
            validation::text("Location", &location, None)?;
            event.location = location;
        }
        if let Some(max_attendees) = patch.max_attendees {
            validation::max_attendees(max_attendees)?;
            event.max_attendees = max_attendees;
        }
        if let Some(is_featured) = patch.is_featured {
            event.is_featured = is_featured;
        }

        if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.unwrap_or(event.start_time);
            let end = patch.end_time.unwrap_or(event.end_time);
            validation::schedule(start, end, now, patch.start_time.is_some())?;
            event.start_time = start;
            event.end_time = end;
        }

        if let Some(ticket_types) = ticket_types {
            event.ticket_types = ticket_types;
        }

        event.updated_at = now;
        Ok(())
    }

    fn toggle_publish(event: &mut Event, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        if !actor.is_admin() {
            return Err(BookingError::forbidden("Only admins can publish events"));
        }
        event.state = match event.state {
            PublicationState::Cancelled => {
                return Err(BookingError::invalid_state(
                    "Cannot publish a cancelled event",
                ));
            }
            PublicationState::Published => PublicationState::Draft,
            PublicationState::Draft if event.start_time <= now => {
                return Err(BookingError::invalid_state(
                    "Cannot publish an event that has already started",
                ));
            }
            PublicationState::Draft => PublicationState::Published,
        };
        event.updated_at = now;
        Ok(())
    }

    fn cancel(event: &mut Event, actor: &Actor, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if !actor.can_manage(event) {
            return Err(BookingError::forbidden("Not authorized to cancel this event"));
        }
        if event.is_cancelled() {
            return Err(BookingError::invalid_state("Event is already cancelled"));
        }
        event.state = PublicationState::Cancelled;
        event.cancellation_reason = reason.filter(|r| !r.trim().is_empty());
        event.cancelled_at = Some(now);
        event.updated_at = now;
        Ok(())
    }

    fn book(
        event: &mut Event,
        booking_id: BookingId,
        user_id: UserId,
        ticket_type_id: TicketTypeId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<ledger::Reserved> {
        if !event.is_published() {
            return Err(BookingError::invalid_state("Event is not open for booking"));
        }
        if event.start_time <= now {
            return Err(BookingError::invalid_state("Event has already started"));
        }
        let quantity = match u64::try_from(quantity) {
            Ok(quantity) if quantity >= 1 => quantity,
            _ => {
                return Err(BookingError::invalid_input(
                    "Quantity must be at least 1",
                ));
            }
        };

        ledger::reserve(
            event,
            ledger::Reservation {
                booking_id,
                user_id,
                ticket_type_id,
                quantity,
                at: now,
            },
        )
    }

    fn cancel_booking(
        event: &mut Event,
        booking_id: BookingId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Money> {
        let Some(booking) = event.booking(booking_id) else {
            return Err(BookingError::not_found("booking", booking_id));
        };
        if booking.user_id != user_id {
            return Err(BookingError::forbidden("Not authorized to cancel this booking"));
        }
        if !booking.is_confirmed() {
            return Err(BookingError::invalid_state("Booking is already cancelled"));
        }
        if event.start_time <= now {
            return Err(BookingError::invalid_state(
                "Cannot cancel a booking once the event has started",
            ));
        }

        ledger::release(event, booking_id, now)
    }
}

impl Reducer for EventReducer {
    type State = Event;
    type Action = EventAction;
    type Environment = EventEnvironment;
    type Output = EventOutcome;
    type Error = BookingError;

    fn reduce(
        &self,
        state: &mut Event,
        action: EventAction,
        env: &EventEnvironment,
    ) -> Result<EventOutcome> {
        let now = env.clock.now();

        match action {
            EventAction::Update {
                actor,
                patch,
                new_ticket_type_ids,
            } => {
                Self::update(state, &actor, patch, new_ticket_type_ids, now)?;
                Ok(EventOutcome::Event(Box::new(state.clone())))
            }
            EventAction::TogglePublish { actor } => {
                Self::toggle_publish(state, &actor, now)?;
                Ok(EventOutcome::Event(Box::new(state.clone())))
            }
            EventAction::Cancel { actor, reason } => {
                Self::cancel(state, &actor, reason, now)?;
                Ok(EventOutcome::Event(Box::new(state.clone())))
            }
            EventAction::Book {
                booking_id,
                user_id,
                ticket_type_id,
                quantity,
            } => {
                let reserved =
                    Self::book(state, booking_id, user_id, ticket_type_id, quantity, now)?;
                Ok(EventOutcome::Booked {
                    booking_id,
                    tickets: reserved.tickets,
                    tickets_remaining: reserved.remaining,
                })
            }
            EventAction::CancelBooking {
                booking_id,
                user_id,
            } => {
                let refund = Self::cancel_booking(state, booking_id, user_id, now)?;
                Ok(EventOutcome::BookingCancelled { booking_id, refund })
            }
        }
    }
}

//! Field-level validation shared by event creation and editing.

use crate::error::{BookingError, Result};
use crate::types::{TicketTypeDraft, TicketTypeId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Non-blank text of at most `max` characters (`None` = no limit).
pub(crate) fn text(field: &str, value: &str, max: Option<usize>) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BookingError::invalid_input(format!("{field} is required")));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(BookingError::invalid_input(format!(
                "{field} cannot be more than {max} characters"
            )));
        }
    }
    Ok(())
}

pub(crate) fn max_attendees(value: u32) -> Result<()> {
    if value == 0 {
        return Err(BookingError::invalid_input(
            "maxAttendees must be at least 1",
        ));
    }
    Ok(())
}

/// `start < end`, and `start` strictly after `now` when `require_future`.
pub(crate) fn schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    require_future: bool,
) -> Result<()> {
    if start >= end {
        return Err(BookingError::invalid_input("End time must be after start time"));
    }
    if require_future && start <= now {
        return Err(BookingError::invalid_input("Start time must be in the future"));
    }
    Ok(())
}

pub(crate) fn ticket_types(drafts: &[TicketTypeDraft]) -> Result<()> {
    let mut seen: HashSet<TicketTypeId> = HashSet::new();
    for draft in drafts {
        if draft.name.trim().is_empty() {
            return Err(BookingError::invalid_input("Ticket type name is required"));
        }
        if draft.max_per_user == 0 {
            return Err(BookingError::invalid_input(format!(
                "Ticket type '{}' must allow at least 1 ticket per user",
                draft.name
            )));
        }
        if let Some(id) = draft.id {
            if !seen.insert(id) {
                return Err(BookingError::invalid_input(format!(
                    "Ticket type id {id} appears more than once"
                )));
            }
        }
    }
    Ok(())
}

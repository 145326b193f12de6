//! Domain types for the event booking backend.
//!
//! The [`Event`] is the aggregate: it owns its ticket types and the bookings
//! made against them, and is only ever changed as a whole through the
//! [`crate::aggregates::EventReducer`]. Nothing outside the aggregate gets a
//! mutable reference to a nested ticket type or booking.

use chrono::{DateTime, Utc};
use eventbook_core::Aggregate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Identifier of a ticket type, scoped to its event
    TicketTypeId
);
uuid_id!(
    /// Identifier of a booking, scoped to its event
    BookingId
);
uuid_id!(
    /// Unique identifier for a user account
    UserId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two amounts, clamping at the maximum representable value
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity, clamping at the maximum representable value
    #[must_use]
    pub const fn saturating_multiply(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

// ============================================================================
// Actors
// ============================================================================

/// Account role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user: books tickets, manages own events
    #[default]
    User,
    /// Administrator: publishes events, sees analytics, bans users
    Admin,
}

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Caller's user id
    pub user_id: UserId,
    /// Caller's role
    pub role: Role,
}

impl Actor {
    /// A regular user.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// An administrator.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Returns `true` for administrators.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Creator of the event or an administrator.
    #[must_use]
    pub fn can_manage(&self, event: &Event) -> bool {
        self.is_admin() || event.created_by == self.user_id
    }
}

// ============================================================================
// Ticket types and bookings
// ============================================================================

/// A named price/quantity tier within one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    /// Identifier, unique within the event
    pub id: TicketTypeId,
    /// Display name ("General Admission")
    pub name: String,
    /// Price per ticket
    pub price: Money,
    /// Remaining unreserved inventory
    pub available: u32,
    /// Cap on confirmed tickets of this type held by one user
    pub max_per_user: u32,
}

const fn default_max_per_user() -> u32 {
    1
}

/// Ticket type as submitted by a client.
///
/// `id` is set when an edit keeps an existing ticket type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeDraft {
    /// Existing ticket type to keep, if any
    #[serde(default)]
    pub id: Option<TicketTypeId>,
    /// Display name
    pub name: String,
    /// Price per ticket in cents
    pub price: Money,
    /// Initial inventory
    pub available: u32,
    /// Per-user cap (defaults to 1)
    #[serde(default = "default_max_per_user")]
    pub max_per_user: u32,
}

impl TicketTypeDraft {
    /// Convenience constructor used by seeds and tests.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money, available: u32, max_per_user: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            available,
            max_per_user,
        }
    }

    /// Materialise the ticket type, generating an id if none was given.
    #[must_use]
    pub fn into_ticket_type(self) -> TicketType {
        TicketType {
            id: self.id.unwrap_or_default(),
            name: self.name,
            price: self.price,
            available: self.available,
            max_per_user: self.max_per_user,
        }
    }
}

/// Lifecycle of a booking. Linear: Pending/Confirmed → Cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Not yet confirmed
    Pending,
    /// Inventory reserved
    Confirmed,
    /// Released; terminal
    Cancelled,
}

/// Payment axis of a booking, independent of [`BookingStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Paid in full
    Paid,
    /// Awaiting payment
    Pending,
    /// Payment failed
    Failed,
}

/// A booking embedded in its event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Identifier
    pub id: BookingId,
    /// Who booked
    pub user_id: UserId,
    /// Which ticket type (may no longer exist on the event after an edit)
    pub ticket_type_id: TicketTypeId,
    /// Number of tickets (≥ 1)
    pub tickets: u32,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Creation time
    pub booked_at: DateTime<Utc>,
    /// Set only on transition to Cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Confirmed and not cancelled.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed)
    }
}

// ============================================================================
// Event aggregate
// ============================================================================

/// Publication state of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// Visible to its creator and admins only
    Draft,
    /// Listed and bookable
    Published,
    /// Terminal
    Cancelled,
}

/// Schedule status derived from the clock and the event's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleStatus {
    /// Event was cancelled
    Cancelled,
    /// End time has passed
    Past,
    /// Between start and end
    Ongoing,
    /// Attendee count reached `maxAttendees`
    FullyBooked,
    /// Starts in the future
    Upcoming,
}

/// An event with its ticket inventory and bookings: one consistency boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub(crate) id: EventId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) location: String,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) end_time: DateTime<Utc>,
    pub(crate) max_attendees: u32,
    pub(crate) attendees: Vec<UserId>,
    pub(crate) ticket_types: Vec<TicketType>,
    pub(crate) bookings: Vec<Booking>,
    pub(crate) created_by: UserId,
    pub(crate) state: PublicationState,
    pub(crate) is_featured: bool,
    pub(crate) cancellation_reason: Option<String>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Aggregate for Event {
    type Id = EventId;
    const KIND: &'static str = "event";

    fn id(&self) -> EventId {
        self.id
    }

    fn child_ids(&self) -> Vec<Uuid> {
        self.bookings.iter().map(|b| Uuid::from(b.id)).collect()
    }
}

impl Event {
    /// Identifier
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Category
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Event type (conference, concert, ...)
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Location
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Start time
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// End time
    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Soft cap on distinct attendees
    #[must_use]
    pub const fn max_attendees(&self) -> u32 {
        self.max_attendees
    }

    /// Users holding at least one confirmed booking
    #[must_use]
    pub fn attendees(&self) -> &[UserId] {
        &self.attendees
    }

    /// Ticket types in declaration order
    #[must_use]
    pub fn ticket_types(&self) -> &[TicketType] {
        &self.ticket_types
    }

    /// Bookings in creation order
    #[must_use]
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Creator
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Publication state
    #[must_use]
    pub const fn state(&self) -> PublicationState {
        self.state
    }

    /// Featured flag
    #[must_use]
    pub const fn is_featured(&self) -> bool {
        self.is_featured
    }

    /// Reason given when the event was cancelled
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// When the event was cancelled
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` once cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.state, PublicationState::Cancelled)
    }

    /// Returns `true` while published.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self.state, PublicationState::Published)
    }

    /// Look up a ticket type.
    #[must_use]
    pub fn ticket_type(&self, id: TicketTypeId) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.id == id)
    }

    /// Look up a booking.
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Tickets of `ticket_type` held by `user` in confirmed bookings.
    #[must_use]
    pub fn confirmed_tickets(&self, user: UserId, ticket_type: TicketTypeId) -> u32 {
        self.bookings
            .iter()
            .filter(|b| b.user_id == user && b.ticket_type_id == ticket_type && b.is_confirmed())
            .fold(0u32, |sum, b| sum.saturating_add(b.tickets))
    }

    /// Largest number of confirmed tickets any one user holds on a tier.
    #[must_use]
    pub fn largest_holding(&self, ticket_type: TicketTypeId) -> u32 {
        self.bookings
            .iter()
            .filter(|b| b.ticket_type_id == ticket_type && b.is_confirmed())
            .map(|b| self.confirmed_tickets(b.user_id, ticket_type))
            .max()
            .unwrap_or(0)
    }

    /// Status as shown to clients at time `now`.
    #[must_use]
    pub fn schedule_status(&self, now: DateTime<Utc>) -> ScheduleStatus {
        if self.is_cancelled() {
            ScheduleStatus::Cancelled
        } else if now >= self.end_time {
            ScheduleStatus::Past
        } else if now >= self.start_time {
            ScheduleStatus::Ongoing
        } else if self.attendee_count() >= u64::from(self.max_attendees) {
            ScheduleStatus::FullyBooked
        } else {
            ScheduleStatus::Upcoming
        }
    }

    /// Number of distinct attendees.
    #[must_use]
    pub fn attendee_count(&self) -> u64 {
        self.attendees.len() as u64
    }

    /// Published events are visible to everyone; drafts and cancelled
    /// events only to their creator and admins.
    #[must_use]
    pub fn visible_to(&self, actor: &Actor) -> bool {
        self.is_published() || actor.can_manage(self)
    }
}

/// Input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    /// Title (≤ 100 chars)
    pub title: String,
    /// Description (≤ 1000 chars)
    pub description: String,
    /// Category
    pub category: String,
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Location
    pub location: String,
    /// Start time (must be in the future)
    pub start_time: DateTime<Utc>,
    /// End time (must be after start)
    pub end_time: DateTime<Utc>,
    /// Soft attendee cap (≥ 1)
    pub max_attendees: u32,
    /// Ticket tiers
    #[serde(default)]
    pub ticket_types: Vec<TicketTypeDraft>,
    /// Featured flag
    #[serde(default)]
    pub is_featured: bool,
    /// Publish immediately (honoured for admins only)
    #[serde(default)]
    pub publish: bool,
}

/// Partial update of an event. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New event type
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New start time
    pub start_time: Option<DateTime<Utc>>,
    /// New end time
    pub end_time: Option<DateTime<Utc>>,
    /// New attendee cap
    pub max_attendees: Option<u32>,
    /// Replacement ticket tiers
    pub ticket_types: Option<Vec<TicketTypeDraft>>,
    /// New featured flag
    pub is_featured: Option<bool>,
}

impl EventPatch {
    /// Fresh ids for the tiers this patch adds, minted once before dispatch so
    /// that a retried update produces the same ids.
    #[must_use]
    pub fn mint_ticket_type_ids(&self) -> Vec<TicketTypeId> {
        self.ticket_types
            .iter()
            .flatten()
            .filter(|draft| draft.id.is_none())
            .map(|_| TicketTypeId::new())
            .collect()
    }
}

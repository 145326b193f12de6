use super::views::{AttendeeView, BookingReceipt, CancellationReceipt, TicketView};
use crate::accounts::{Account, AccountDirectory, AuthError};
use crate::aggregates::analytics::{self, BookingBreakdown, DateRange};
use crate::aggregates::{
    EventAction, EventEnvironment, EventOutcome, EventReducer, check_delete, create_event,
};
use crate::error::{BookingError, Result};
use crate::metrics;
use crate::types::{
    Actor, BookingId, Event, EventDraft, EventId, EventPatch, Money, PublicationState,
    TicketTypeId, UserId,
};
use chrono::{DateTime, Utc};
use eventbook_core::AggregateStore;
use eventbook_core::environment::Clock;
use eventbook_runtime::memory::InMemoryStore;
use eventbook_runtime::{RetryPolicy, Store};
use std::sync::Arc;

/// Booking workflow, event management, queries and admin operations.
pub struct BookingService {
    events: Store<EventReducer>,
    accounts: Arc<dyn AccountDirectory>,
}

impl BookingService {
    /// Creates a service over an existing event store runtime.
    #[must_use]
    pub fn new(events: Store<EventReducer>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self { events, accounts }
    }

    /// Creates a service over any aggregate store backend.
    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn AggregateStore<Event>>,
        clock: Arc<dyn Clock>,
        accounts: Arc<dyn AccountDirectory>,
        policy: RetryPolicy,
    ) -> Self {
        let events = Store::new(
            EventReducer::new(),
            EventEnvironment::new(clock),
            backend,
            policy,
        );
        Self::new(events, accounts)
    }

    /// Creates a service backed by process memory with the default retry policy.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self::with_backend(
            Arc::new(InMemoryStore::<Event>::new()),
            clock,
            accounts,
            RetryPolicy::default(),
        )
    }

    /// The account directory.
    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountDirectory> {
        &self.accounts
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.events.environment().clock.now()
    }

    /// Resolve a bearer token to an account.
    ///
    /// # Errors
    ///
    /// See [`AccountDirectory::authenticate`].
    pub async fn authenticate(&self, token: &str) -> std::result::Result<Account, AuthError> {
        self.accounts.authenticate(token).await
    }

    // ========================================================================
    // Event lifecycle
    // ========================================================================

    /// Create an event. Drafts unless an admin asks to publish immediately.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an invalid draft; `Internal` on storage failure.
    #[tracing::instrument(skip(self, draft), fields(actor = %actor.user_id))]
    pub async fn create_event(&self, actor: Actor, draft: EventDraft) -> Result<Event> {
        let event = create_event(EventId::new(), actor, draft, self.now())
            .inspect_err(|err| rejected("create_event", err))?;
        self.events
            .create(event.clone())
            .await
            .map_err(|err| fail("create_event", err.into()))?;

        metrics::record_event_created();
        tracing::info!(event_id = %event.id(), state = ?event.state(), "Event created");
        Ok(event)
    }

    /// Edit an event's details, schedule or ticket types.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidState` (cancelled, or a tier's cap
    /// below an existing holding), `InvalidInput` (including unknown tier ids).
    #[tracing::instrument(skip(self, patch), fields(actor = %actor.user_id))]
    pub async fn update_event(&self, actor: Actor, id: EventId, patch: EventPatch) -> Result<Event> {
        let new_ticket_type_ids = patch.mint_ticket_type_ids();
        let action = EventAction::Update {
            actor,
            patch,
            new_ticket_type_ids,
        };
        let outcome = self.dispatch("update_event", id, action).await?;
        into_event(outcome)
    }

    /// Flip an event between Draft and Published.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` (not admin), `InvalidState`.
    #[tracing::instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn toggle_publish(&self, actor: Actor, id: EventId) -> Result<Event> {
        let outcome = self
            .dispatch("toggle_publish", id, EventAction::TogglePublish { actor })
            .await?;
        let event = into_event(outcome)?;
        tracing::info!(event_id = %id, state = ?event.state(), "Publication toggled");
        Ok(event)
    }

    /// Cancel an event. Existing bookings are left as they are.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidState` (already cancelled).
    #[tracing::instrument(skip(self, reason), fields(actor = %actor.user_id))]
    pub async fn cancel_event(&self, actor: Actor, id: EventId, reason: Option<String>) -> Result<Event> {
        let outcome = self
            .dispatch("cancel_event", id, EventAction::Cancel { actor, reason })
            .await?;
        tracing::info!(event_id = %id, "Event cancelled");
        into_event(outcome)
    }

    /// Delete an event that nobody is attending.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidState` (has attendees).
    #[tracing::instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_event(&self, actor: Actor, id: EventId) -> Result<()> {
        self.events
            .delete_if(id, |event, _env| check_delete(event, &actor))
            .await
            .map_err(|err| fail("delete_event", err.into()))?;
        tracing::info!(event_id = %id, "Event deleted");
        Ok(())
    }

    // ========================================================================
    // Booking workflow
    // ========================================================================

    /// Reserve `quantity` tickets of one type for `actor`.
    ///
    /// # Errors
    ///
    /// In order of precedence: `NotFound` (event), `InvalidState` (not
    /// published, or already started), `InvalidInput` (quantity),
    /// `NotFound` (ticket type), `InsufficientInventory`, `QuotaExceeded`,
    /// then `ConcurrencyConflict` once the retry budget is spent.
    #[tracing::instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn book(
        &self,
        actor: Actor,
        event_id: EventId,
        ticket_type_id: TicketTypeId,
        quantity: i64,
    ) -> Result<BookingReceipt> {
        let booking_id = BookingId::new();
        let action = EventAction::Book {
            booking_id,
            user_id: actor.user_id,
            ticket_type_id,
            quantity,
        };

        match self.dispatch("book", event_id, action).await? {
            EventOutcome::Booked {
                booking_id,
                tickets,
                tickets_remaining,
            } => {
                metrics::record_booking_created(u64::from(tickets));
                tracing::info!(%booking_id, tickets, tickets_remaining, "Tickets booked");
                Ok(BookingReceipt {
                    booking_id,
                    event_id,
                    tickets_remaining,
                })
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Cancel one of `user`'s bookings and return its tickets to inventory.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` (someone else's booking), `InvalidState`
    /// (already cancelled, or the event has started).
    #[tracing::instrument(skip(self))]
    pub async fn cancel_booking(&self, user: UserId, booking_id: BookingId) -> Result<CancellationReceipt> {
        let event_id = self
            .events
            .locate(booking_id.into())
            .await
            .map_err(|err| fail("cancel_booking", err.into()))?
            .ok_or_else(|| fail("cancel_booking", BookingError::not_found("booking", booking_id)))?;

        let action = EventAction::CancelBooking {
            booking_id,
            user_id: user,
        };
        match self.dispatch("cancel_booking", event_id, action).await? {
            EventOutcome::BookingCancelled { booking_id, refund } => {
                metrics::record_booking_cancelled(refund.cents());
                tracing::info!(%booking_id, %event_id, %refund, "Booking cancelled");
                Ok(CancellationReceipt {
                    booking_id,
                    event_id,
                    refund_amount: refund,
                })
            }
            other => Err(unexpected(&other)),
        }
    }

    async fn dispatch(&self, operation: &'static str, id: EventId, action: EventAction) -> Result<EventOutcome> {
        self.events
            .send(id, action)
            .await
            .map_err(|err| fail(operation, err.into()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn all(&self) -> Result<Vec<Event>> {
        Ok(self.events.snapshot().await?)
    }

    /// Published events, soonest first.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    pub async fn published_events(&self) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .all()
            .await?
            .into_iter()
            .filter(Event::is_published)
            .collect();
        events.sort_by_key(Event::start_time);
        Ok(events)
    }

    /// One event, if `actor` may see it. Drafts of other users look missing.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Internal` on storage failure.
    pub async fn event(&self, actor: &Actor, id: EventId) -> Result<Event> {
        self.events
            .state(id)
            .await?
            .filter(|event| event.visible_to(actor))
            .ok_or_else(|| BookingError::not_found("event", id))
    }

    /// Events created by `actor`, newest first.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    pub async fn my_events(&self, actor: &Actor) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .all()
            .await?
            .into_iter()
            .filter(|event| event.created_by() == actor.user_id)
            .collect();
        events.sort_by_key(|event| std::cmp::Reverse(event.created_at()));
        Ok(events)
    }

    /// Every booking `user` has made, newest first.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    pub async fn my_tickets(&self, user: UserId) -> Result<Vec<TicketView>> {
        let events = self.all().await?;
        let mut tickets: Vec<TicketView> = events
            .iter()
            .flat_map(|event| {
                event
                    .bookings()
                    .iter()
                    .filter(move |booking| booking.user_id == user)
                    .map(move |booking| TicketView {
                        booking_id: booking.id,
                        event_id: event.id(),
                        event_title: event.title().to_string(),
                        event_start: event.start_time(),
                        ticket_type_id: booking.ticket_type_id,
                        ticket_type_name: event
                            .ticket_type(booking.ticket_type_id)
                            .map(|t| t.name.clone()),
                        tickets: booking.tickets,
                        status: booking.status,
                        payment_status: booking.payment_status,
                        booked_at: booking.booked_at,
                        cancelled_at: booking.cancelled_at,
                    })
            })
            .collect();
        tickets.sort_by_key(|ticket| std::cmp::Reverse(ticket.booked_at));
        Ok(tickets)
    }

    // ========================================================================
    // Admin
    // ========================================================================

    /// Every event, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on storage failure.
    pub async fn all_events(&self, admin: &Actor) -> Result<Vec<Event>> {
        require_admin(admin)?;
        let mut events = self.all().await?;
        events.sort_by_key(|event| std::cmp::Reverse(event.created_at()));
        Ok(events)
    }

    /// Drafts awaiting publication, oldest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on storage failure.
    pub async fn pending_events(&self, admin: &Actor) -> Result<Vec<Event>> {
        require_admin(admin)?;
        let mut events: Vec<Event> = self
            .all()
            .await?
            .into_iter()
            .filter(|event| event.state() == PublicationState::Draft)
            .collect();
        events.sort_by_key(Event::created_at);
        Ok(events)
    }

    /// Attendees and bookings of one event.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `NotFound`.
    pub async fn attendees(&self, admin: &Actor, id: EventId) -> Result<AttendeeView> {
        require_admin(admin)?;
        let event = self
            .events
            .state(id)
            .await?
            .ok_or_else(|| BookingError::not_found("event", id))?;
        Ok(AttendeeView {
            event_id: event.id(),
            title: event.title().to_string(),
            attendees: event.attendees().to_vec(),
            attendee_count: event.attendee_count(),
            max_attendees: event.max_attendees(),
            bookings: event.bookings().to_vec(),
        })
    }

    /// Confirmed, paid revenue of events in `range`.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on storage failure.
    pub async fn total_revenue(&self, admin: &Actor, range: &DateRange) -> Result<Money> {
        require_admin(admin)?;
        Ok(analytics::total_revenue(&self.all().await?, range))
    }

    /// Attendees of events in `range`.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on storage failure.
    pub async fn total_attendees(&self, admin: &Actor, range: &DateRange) -> Result<u64> {
        require_admin(admin)?;
        Ok(analytics::total_attendees(&self.all().await?, range))
    }

    /// Bookings by status, optionally limited to events in `range`.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on storage failure.
    pub async fn booking_breakdown(&self, admin: &Actor, range: Option<&DateRange>) -> Result<BookingBreakdown> {
        require_admin(admin)?;
        Ok(analytics::booking_breakdown(&self.all().await?, range))
    }

    /// Number of regular (non-admin) users.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Internal` on directory failure.
    pub async fn total_users(&self, admin: &Actor) -> Result<u64> {
        require_admin(admin)?;
        self.accounts.count_users().await.map_err(directory_error)
    }

    /// Ban a regular user.
    ///
    /// # Errors
    ///
    /// `Forbidden` when banning yourself or another admin; `NotFound`.
    #[tracing::instrument(skip(self, reason), fields(admin = %admin.user_id))]
    pub async fn ban_user(&self, admin: &Actor, target: UserId, reason: Option<String>) -> Result<Account> {
        require_admin(admin)?;
        if target == admin.user_id {
            return Err(BookingError::forbidden("You cannot ban yourself"));
        }
        let account = self
            .accounts
            .find(target)
            .await
            .map_err(directory_error)?
            .ok_or_else(|| BookingError::not_found("user", target))?;
        if account.actor().is_admin() {
            return Err(BookingError::forbidden("Admins cannot be banned"));
        }

        let banned = self
            .accounts
            .ban(target, reason, self.now())
            .await
            .map_err(directory_error)?
            .ok_or_else(|| BookingError::not_found("user", target))?;
        tracing::warn!(user = %target, "User banned");
        Ok(banned)
    }
}

fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(BookingError::forbidden("Admin access required"))
    }
}

fn into_event(outcome: EventOutcome) -> Result<Event> {
    match outcome {
        EventOutcome::Event(event) => Ok(*event),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(outcome: &EventOutcome) -> BookingError {
    BookingError::Internal(format!("unexpected reducer outcome: {outcome:?}"))
}

fn directory_error(err: AuthError) -> BookingError {
    BookingError::Internal(err.to_string())
}

fn rejected(operation: &'static str, err: &BookingError) {
    metrics::record_rejection(operation, err);
    match err {
        BookingError::Internal(detail) => tracing::error!(operation, %detail, "Operation failed"),
        BookingError::ConcurrencyConflict { .. } => {
            tracing::warn!(operation, error = %err, "Retry budget exhausted");
        }
        _ => tracing::debug!(operation, error = %err, "Request rejected"),
    }
}

fn fail(operation: &'static str, err: BookingError) -> BookingError {
    rejected(operation, &err);
    err
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::accounts::{InMemoryAccounts, SeedAccount};
    use crate::types::{Money, Role, TicketTypeDraft};
    use chrono::Duration;
    use eventbook_testing::{ManualClock, test_clock};

    struct Fixture {
        service: BookingService,
        clock: ManualClock,
        admin: Actor,
        user: Actor,
    }

    fn account(role: Role) -> Account {
        Account {
            id: UserId::new(),
            name: format!("{role:?}"),
            email: "someone@example.com".into(),
            role,
            banned: false,
            ban_reason: None,
            banned_at: None,
        }
    }

    fn fixture() -> Fixture {
        let admin = account(Role::Admin);
        let user = account(Role::User);
        let accounts = InMemoryAccounts::from_seed([
            SeedAccount { token: "admin".into(), account: admin.clone() },
            SeedAccount { token: "user".into(), account: user.clone() },
        ]);
        let clock = ManualClock::new(test_clock().now());
        let service = BookingService::in_memory(Arc::new(clock.clone()), Arc::new(accounts));
        Fixture { service, clock, admin: admin.actor(), user: user.actor() }
    }

    fn draft(now: DateTime<Utc>) -> EventDraft {
        EventDraft {
            title: "Rust Meetup".into(),
            description: "Monthly meetup".into(),
            category: "tech".into(),
            kind: "meetup".into(),
            location: "Berlin".into(),
            start_time: now + Duration::days(7),
            end_time: now + Duration::days(7) + Duration::hours(3),
            max_attendees: 50,
            ticket_types: vec![TicketTypeDraft::new("Standard", Money::from_cents(1000), 10, 4)],
            is_featured: false,
            publish: true,
        }
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_other_users() {
        let f = fixture();
        let event = f.service.create_event(f.user, draft(f.clock.now())).await.unwrap();
        assert_eq!(event.state(), PublicationState::Draft);

        let stranger = Actor::user(UserId::new());
        let err = f.service.event(&stranger, event.id()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(f.service.event(&f.user, event.id()).await.is_ok());
        assert!(f.service.published_events().await.unwrap().is_empty());
        assert_eq!(f.service.pending_events(&f.admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn book_then_cancel_by_booking_id() {
        let f = fixture();
        let event = f.service.create_event(f.admin, draft(f.clock.now())).await.unwrap();
        let ticket_type = event.ticket_types()[0].id;

        let receipt = f.service.book(f.user, event.id(), ticket_type, 3).await.unwrap();
        assert_eq!(receipt.tickets_remaining, 7);

        let tickets = f.service.my_tickets(f.user.user_id).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].ticket_type_name.as_deref(), Some("Standard"));

        let cancelled = f.service.cancel_booking(f.user.user_id, receipt.booking_id).await.unwrap();
        assert_eq!(cancelled.event_id, event.id());
        assert_eq!(cancelled.refund_amount, Money::from_cents(3000));

        let unknown = BookingId::new();
        let err = f.service.cancel_booking(f.user.user_id, unknown).await.unwrap_err();
        assert_eq!(err, BookingError::not_found("booking", unknown));
    }

    #[tokio::test]
    async fn cancel_after_start_is_rejected() {
        let f = fixture();
        let event = f.service.create_event(f.admin, draft(f.clock.now())).await.unwrap();
        let receipt = f
            .service
            .book(f.user, event.id(), event.ticket_types()[0].id, 1)
            .await
            .unwrap();

        f.clock.advance(Duration::days(8));
        let err = f.service.cancel_booking(f.user.user_id, receipt.booking_id).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[tokio::test]
    async fn delete_only_without_attendees() {
        let f = fixture();
        let event = f.service.create_event(f.admin, draft(f.clock.now())).await.unwrap();
        f.service.book(f.user, event.id(), event.ticket_types()[0].id, 1).await.unwrap();

        let err = f.service.delete_event(f.admin, event.id()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_state");

        let empty = f.service.create_event(f.admin, draft(f.clock.now())).await.unwrap();
        f.service.delete_event(f.admin, empty.id()).await.unwrap();
        let gone = f.service.event(&f.admin, empty.id()).await.unwrap_err();
        assert_eq!(gone.kind(), "not_found");
    }

    #[tokio::test]
    async fn ban_rules() {
        let f = fixture();
        assert_eq!(
            f.service.ban_user(&f.admin, f.admin.user_id, None).await.unwrap_err().kind(),
            "forbidden"
        );
        assert_eq!(
            f.service.ban_user(&f.admin, UserId::new(), None).await.unwrap_err().kind(),
            "not_found"
        );
        assert_eq!(
            f.service.ban_user(&f.user, f.admin.user_id, None).await.unwrap_err().kind(),
            "forbidden"
        );

        let banned = f.service.ban_user(&f.admin, f.user.user_id, Some("spam".into())).await.unwrap();
        assert!(banned.banned);
        assert_eq!(banned.banned_at, Some(f.clock.now()));
        assert!(matches!(
            f.service.authenticate("user").await,
            Err(AuthError::Banned { .. })
        ));
        assert_eq!(f.service.total_users(&f.admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn admin_queries_require_admin() {
        let f = fixture();
        assert_eq!(f.service.all_events(&f.user).await.unwrap_err().kind(), "forbidden");
        assert_eq!(f.service.booking_breakdown(&f.user, None).await.unwrap_err().kind(), "forbidden");
        assert!(f.service.all_events(&f.admin).await.unwrap().is_empty());
    }
}

//! Optimistic-concurrency retry behaviour.
//!
//! A `ConflictInjectingStore` commits a rival write before selected saves so
//! that the service's save genuinely loses the version check. Within the
//! retry budget the operation must succeed exactly once; beyond it the caller
//! gets `ConcurrencyConflict` and nothing is written.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use booking::{BookingError, BookingService, Event};
use common::{actor, draft, seeded_accounts, tier};
use eventbook_core::environment::Clock;
use eventbook_runtime::{RetryPolicy, memory::InMemoryStore};
use eventbook_testing::{ConflictInjectingStore, FixedClock, test_clock};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: BookingService,
    store: Arc<ConflictInjectingStore<Event>>,
    admin: booking::Account,
    alice: booking::Account,
    clock: FixedClock,
}

fn harness(max_retries: usize) -> Harness {
    let (accounts, admin, alice, _bob) = seeded_accounts();
    let store = Arc::new(ConflictInjectingStore::new(
        Arc::new(InMemoryStore::<Event>::new()),
        0,
    ));
    let policy = RetryPolicy::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .jitter(false)
        .build();
    let clock = test_clock();
    let service = BookingService::with_backend(
        store.clone(),
        Arc::new(clock.clone()),
        Arc::new(accounts),
        policy,
    );
    Harness { service, store, admin, alice, clock }
}

#[tokio::test]
async fn conflicts_within_budget_are_retried() {
    let h = harness(3);
    let event = h
        .service
        .create_event(actor(&h.admin), draft(h.clock.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    let before = h.store.saves();
    h.store.inject(3);
    let receipt = h
        .service
        .book(actor(&h.alice), event.id(), tier_id, 2)
        .await
        .unwrap();

    assert_eq!(receipt.tickets_remaining, 8);
    assert_eq!(h.store.remaining(), 0);
    assert_eq!(h.store.saves() - before, 4);

    // Applied exactly once despite four attempts.
    let stored = h.service.event(&actor(&h.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 8);
    assert_eq!(stored.bookings().len(), 1);
}

#[tokio::test]
async fn conflicts_beyond_budget_surface_without_mutation() {
    let h = harness(2);
    let event = h
        .service
        .create_event(actor(&h.admin), draft(h.clock.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    h.store.inject(3);
    let err = h
        .service
        .book(actor(&h.alice), event.id(), tier_id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ConcurrencyConflict { .. }));
    assert_eq!(h.store.remaining(), 0);

    let stored = h.service.event(&actor(&h.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 10);
    assert!(stored.bookings().is_empty());
    assert!(stored.attendees().is_empty());
}

#[tokio::test]
async fn cancellation_is_retried_too() {
    let h = harness(1);
    let event = h
        .service
        .create_event(actor(&h.admin), draft(h.clock.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;
    let receipt = h
        .service
        .book(actor(&h.alice), event.id(), tier_id, 3)
        .await
        .unwrap();

    h.store.inject(1);
    h.service
        .cancel_booking(h.alice.id, receipt.booking_id)
        .await
        .unwrap();

    let stored = h.service.event(&actor(&h.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 10);
}

#[tokio::test]
async fn rejections_are_not_retried() {
    let h = harness(3);
    let event = h
        .service
        .create_event(actor(&h.admin), draft(h.clock.now(), vec![tier(1, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    let before = h.store.saves();
    let err = h
        .service
        .book(actor(&h.alice), event.id(), tier_id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InsufficientInventory { .. }));
    assert_eq!(h.store.saves(), before);
}

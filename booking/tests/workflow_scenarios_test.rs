//! End-to-end booking workflows against the in-memory backend.
//!
//! Each test drives `BookingService` the way the HTTP layer does and checks
//! the inventory, booking and analytics effects.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use booking::aggregates::DateRange;
use booking::{BookingError, BookingStatus, EventPatch, Money, PaymentStatus, TicketTypeDraft};
use chrono::Duration;
use common::{actor, draft, fixture, tier};

/// Per-user quota is checked against confirmed holdings, and inventory is
/// checked before quota.
#[tokio::test]
async fn quota_and_inventory_limits() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(5, 2, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    let receipt = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 2)
        .await
        .unwrap();
    assert_eq!(receipt.tickets_remaining, 3);

    let err = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::QuotaExceeded { already_held: 2, max_per_user: 2, .. }
    ));

    let err = f
        .service
        .book(actor(&f.bob), event.id(), tier_id, 4)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientInventory { requested: 4, available: 3 }
    ));

    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 3);
    assert_eq!(stored.bookings().len(), 1);
    assert_eq!(stored.attendees(), &[f.alice.id]);
}

/// Cancelling a booking restocks inventory and refunds price × tickets.
#[tokio::test]
async fn cancellation_restocks_and_refunds() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(5, 2, 1250)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    let receipt = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 2)
        .await
        .unwrap();
    let refund = f
        .service
        .cancel_booking(f.alice.id, receipt.booking_id)
        .await
        .unwrap();
    assert_eq!(refund.refund_amount, Money::from_cents(2500));
    assert_eq!(refund.event_id, event.id());

    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 5);
    assert!(stored.attendees().is_empty());
    let booking = stored.booking(receipt.booking_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert!(booking.cancelled_at.is_some());

    let again = f
        .service
        .cancel_booking(f.alice.id, receipt.booking_id)
        .await
        .unwrap_err();
    assert!(matches!(again, BookingError::InvalidState(_)));

    // Quota frees up once the booking is cancelled.
    f.service
        .book(actor(&f.alice), event.id(), tier_id, 2)
        .await
        .unwrap();
}

/// Events that have started no longer accept bookings.
#[tokio::test]
async fn booking_a_started_event_is_rejected() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(5, 2, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    f.clock.advance(Duration::days(8));
    let err = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));

    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 5);
    assert!(stored.bookings().is_empty());
}

/// Cancelled events reject bookings even with stock left.
#[tokio::test]
async fn booking_a_cancelled_event_is_rejected() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(100, 10, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    f.service
        .cancel_event(actor(&f.admin), event.id(), Some("Venue flooded".into()))
        .await
        .unwrap();

    let err = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));

    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 100);
    assert_eq!(stored.cancellation_reason(), Some("Venue flooded"));
}

/// Revenue counts confirmed, paid bookings only.
#[tokio::test]
async fn revenue_ignores_cancelled_bookings() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;

    f.service
        .book(actor(&f.alice), event.id(), tier_id, 3)
        .await
        .unwrap();
    let cancelled = f
        .service
        .book(actor(&f.bob), event.id(), tier_id, 2)
        .await
        .unwrap();
    f.service
        .cancel_booking(f.bob.id, cancelled.booking_id)
        .await
        .unwrap();

    let range = DateRange::new(f.now(), f.now() + Duration::days(30)).unwrap();
    let revenue = f
        .service
        .total_revenue(&actor(&f.admin), &range)
        .await
        .unwrap();
    assert_eq!(revenue, Money::from_cents(3000));

    let attendees = f
        .service
        .total_attendees(&actor(&f.admin), &range)
        .await
        .unwrap();
    assert_eq!(attendees, 1);

    let breakdown = f
        .service
        .booking_breakdown(&actor(&f.admin), None)
        .await
        .unwrap();
    assert_eq!(breakdown.confirmed, 1);
    assert_eq!(breakdown.cancelled, 1);
    assert_eq!(breakdown.total, 2);

    // A window that ends before the event contributes nothing.
    let earlier = DateRange::new(f.now(), f.now() + Duration::days(1)).unwrap();
    let revenue = f
        .service
        .total_revenue(&actor(&f.admin), &earlier)
        .await
        .unwrap();
    assert_eq!(revenue, Money::ZERO);
}

#[tokio::test]
async fn my_bookings_include_event_and_tier_names() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;
    f.service
        .book(actor(&f.alice), event.id(), tier_id, 2)
        .await
        .unwrap();

    let tickets = f.service.my_tickets(f.alice.id).await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].event_title, "RustConf");
    assert_eq!(tickets[0].ticket_type_name.as_deref(), Some("General"));
    assert_eq!(tickets[0].tickets, 2);
    assert_eq!(tickets[0].payment_status, PaymentStatus::Paid);
    assert!(f.service.my_tickets(f.bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn users_cannot_cancel_each_others_bookings() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;
    let receipt = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap();

    let err = f
        .service
        .cancel_booking(f.bob.id, receipt.booking_id)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
}

#[tokio::test]
async fn events_with_attendees_cannot_be_deleted() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;
    f.service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap();

    let err = f
        .service
        .delete_event(actor(&f.admin), event.id())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));

    let empty = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 5, 1000)]))
        .await
        .unwrap();
    f.service
        .delete_event(actor(&f.admin), empty.id())
        .await
        .unwrap();
    assert!(f.service.event(&actor(&f.admin), empty.id()).await.is_err());
}

/// Removing a tier leaves its bookings behind. Cancelling one refunds nothing
/// and leaves the surviving tiers' inventory alone.
#[tokio::test]
async fn cancelling_a_booking_on_a_removed_tier_refunds_nothing() {
    let f = fixture();
    let mut vip = tier(10, 2, 9000);
    vip.name = "VIP".into();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(20, 4, 2500), vip]))
        .await
        .unwrap();
    let general = event.ticket_types()[0].id;
    let vip = event.ticket_types()[1].id;

    let receipt = f.service.book(actor(&f.alice), event.id(), vip, 2).await.unwrap();

    let edited = f
        .service
        .update_event(
            actor(&f.admin),
            event.id(),
            EventPatch {
                ticket_types: Some(vec![TicketTypeDraft { id: Some(general), ..tier(20, 4, 2500) }]),
                ..EventPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.ticket_types().len(), 1);
    assert!(edited.ticket_type(vip).is_none());

    let refund = f
        .service
        .cancel_booking(f.alice.id, receipt.booking_id)
        .await
        .unwrap();
    assert_eq!(refund.refund_amount, Money::ZERO);

    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].available, 20);
    assert_eq!(
        stored.booking(receipt.booking_id).unwrap().status,
        BookingStatus::Cancelled
    );
}

/// A tier that was removed cannot be brought back under its old id to pick
/// up the bookings it left behind.
#[tokio::test]
async fn removed_tier_ids_cannot_be_reused() {
    let f = fixture();
    let mut vip = tier(10, 2, 9000);
    vip.name = "VIP".into();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(20, 4, 2500), vip]))
        .await
        .unwrap();
    let general = event.ticket_types()[0].id;
    let vip = event.ticket_types()[1].id;
    let receipt = f.service.book(actor(&f.alice), event.id(), vip, 2).await.unwrap();

    let keep_general = || TicketTypeDraft { id: Some(general), ..tier(20, 4, 2500) };
    f.service
        .update_event(
            actor(&f.admin),
            event.id(),
            EventPatch { ticket_types: Some(vec![keep_general()]), ..EventPatch::default() },
        )
        .await
        .unwrap();

    let err = f
        .service
        .update_event(
            actor(&f.admin),
            event.id(),
            EventPatch {
                ticket_types: Some(vec![
                    keep_general(),
                    TicketTypeDraft { id: Some(vip), ..tier(10, 4, 99_900) },
                ]),
                ..EventPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidInput(_)));

    // Tiers without an id are still added, under a fresh one.
    let edited = f
        .service
        .update_event(
            actor(&f.admin),
            event.id(),
            EventPatch {
                ticket_types: Some(vec![keep_general(), tier(10, 4, 99_900)]),
                ..EventPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.ticket_types().len(), 2);
    assert_ne!(edited.ticket_types()[1].id, vip);

    let refund = f
        .service
        .cancel_booking(f.alice.id, receipt.booking_id)
        .await
        .unwrap();
    assert_eq!(refund.refund_amount, Money::ZERO);
}

/// A tier's per-user cap cannot drop below what an attendee already holds.
#[tokio::test]
async fn per_user_cap_cannot_drop_below_existing_holdings() {
    let f = fixture();
    let event = f
        .service
        .create_event(actor(&f.admin), draft(f.now(), vec![tier(10, 4, 1000)]))
        .await
        .unwrap();
    let tier_id = event.ticket_types()[0].id;
    f.service.book(actor(&f.alice), event.id(), tier_id, 3).await.unwrap();

    let capped = |max_per_user| EventPatch {
        ticket_types: Some(vec![TicketTypeDraft { id: Some(tier_id), ..tier(7, max_per_user, 1000) }]),
        ..EventPatch::default()
    };

    let err = f
        .service
        .update_event(actor(&f.admin), event.id(), capped(1))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));
    let stored = f.service.event(&actor(&f.admin), event.id()).await.unwrap();
    assert_eq!(stored.ticket_types()[0].max_per_user, 4);

    let edited = f
        .service
        .update_event(actor(&f.admin), event.id(), capped(3))
        .await
        .unwrap();
    assert_eq!(edited.ticket_types()[0].max_per_user, 3);

    let err = f
        .service
        .book(actor(&f.alice), event.id(), tier_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::QuotaExceeded { already_held: 3, max_per_user: 3, .. }
    ));
}

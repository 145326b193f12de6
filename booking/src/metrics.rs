//! Business metrics for the booking backend.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_bookings_total{status}` - Bookings created and cancelled
//! - `booking_rejections_total{operation, reason}` - Refused requests by error kind
//! - `booking_tickets_sold_total` - Tickets reserved
//! - `booking_refunds_cents_total` - Refunds owed on cancellation, in cents
//! - `booking_events_created_total` - Events created
//! - `eventbook_store_conflicts_total{kind}` - Optimistic concurrency conflicts
//!   (recorded by the runtime, described here)

use crate::error::BookingError;
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "booking_bookings_total",
        "Total number of bookings by status (created, cancelled)"
    );
    describe_counter!(
        "booking_rejections_total",
        "Requests refused by operation and error kind"
    );
    describe_counter!("booking_tickets_sold_total", "Total number of tickets sold");
    describe_counter!(
        "booking_refunds_cents_total",
        "Total refunds owed on booking cancellation in cents"
    );
    describe_counter!(
        "booking_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "eventbook_store_conflicts_total",
        "Optimistic concurrency conflicts seen while saving aggregates"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a booking created.
///
/// # Arguments
///
/// * `tickets` - Number of tickets reserved
pub fn record_booking_created(tickets: u64) {
    metrics::counter!("booking_bookings_total", "status" => "created").increment(1);
    metrics::counter!("booking_tickets_sold_total").increment(tickets);
    tracing::debug!(tickets, "Recorded booking_created metric");
}

/// Record a booking cancelled.
///
/// # Arguments
///
/// * `refund_cents` - Refund owed in cents
pub fn record_booking_cancelled(refund_cents: u64) {
    metrics::counter!("booking_bookings_total", "status" => "cancelled").increment(1);
    metrics::counter!("booking_refunds_cents_total").increment(refund_cents);
    tracing::debug!(refund_cents, "Recorded booking_cancelled metric");
}

/// Record a refused request.
pub fn record_rejection(operation: &'static str, error: &BookingError) {
    metrics::counter!(
        "booking_rejections_total",
        "operation" => operation,
        "reason" => error.kind()
    )
    .increment(1);
}

/// Record an event created.
pub fn record_event_created() {
    metrics::counter!("booking_events_created_total").increment(1);
    tracing::debug!("Recorded event_created metric");
}

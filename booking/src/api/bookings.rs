//! Booking API endpoints.
//!
//! - POST /api/events/:id/book - Book tickets of one type
//! - POST /api/bookings/:id/cancel - Cancel one of the caller's bookings

use crate::app::{BookingReceipt, CancellationReceipt};
use crate::auth::middleware::SessionUser;
use crate::server::state::AppState;
use crate::types::{BookingId, EventId, TicketTypeId};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use eventbook_web::{AppError, CorrelationId};
use serde::{Deserialize, Serialize};

/// Request to book tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicketsRequest {
    /// Ticket type to book
    pub ticket_type_id: TicketTypeId,
    /// Number of tickets; must be at least 1
    pub quantity: i64,
}

/// Book tickets.
///
/// ```text
/// POST /api/events/:id/book {"ticketTypeId": "...", "quantity": 2}
/// → 201 {"bookingId": "...", "eventId": "...", "ticketsRemaining": 3}
/// ```
///
/// # Errors
///
/// Returns `AppError` with the failed precondition: 404 for a missing event
/// or ticket type, 400 for a bad quantity, 409 for state, inventory, quota
/// and concurrency failures.
pub async fn book_tickets(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: SessionUser,
    path: Result<Path<EventId>, PathRejection>,
    payload: Result<Json<BookTicketsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let Path(event_id) = path?;
    let Json(request) = payload?;
    tracing::debug!(
        correlation_id = %correlation_id.0,
        %event_id,
        ticket_type_id = %request.ticket_type_id,
        quantity = request.quantity,
        "Booking requested"
    );

    let receipt = state
        .service
        .book(
            session.actor(),
            event_id,
            request.ticket_type_id,
            request.quantity,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Cancel a booking.
///
/// ```text
/// POST /api/bookings/:id/cancel → 200 {"bookingId": "...", "eventId": "...", "refundAmount": 5000}
/// ```
///
/// # Errors
///
/// Returns `AppError`: 404 unknown booking, 403 someone else's booking,
/// 409 already cancelled or the event has started.
pub async fn cancel_booking(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    session: SessionUser,
    path: Result<Path<BookingId>, PathRejection>,
) -> Result<Json<CancellationReceipt>, AppError> {
    let Path(booking_id) = path?;
    tracing::debug!(correlation_id = %correlation_id.0, %booking_id, "Cancellation requested");
    let receipt = state
        .service
        .cancel_booking(session.user_id, booking_id)
        .await?;
    Ok(Json(receipt))
}

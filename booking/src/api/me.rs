//! Endpoints scoped to the caller.
//!
//! - GET /api/me/events - Events the caller created
//! - GET /api/me/bookings - The caller's bookings

use super::events::{EventResponse, render};
use crate::app::TicketView;
use crate::auth::middleware::SessionUser;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use eventbook_web::AppError;

/// Events created by the caller, newest first.
///
/// # Errors
///
/// Returns `AppError` if storage fails.
pub async fn my_events(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.service.my_events(&session.actor()).await?;
    Ok(Json(render(&events, state.service.now())))
}

/// The caller's bookings with event title and ticket type name.
///
/// # Errors
///
/// Returns `AppError` if storage fails.
pub async fn my_bookings(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Vec<TicketView>>, AppError> {
    Ok(Json(state.service.my_tickets(session.user_id).await?))
}

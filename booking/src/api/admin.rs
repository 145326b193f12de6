//! Admin endpoints.
//!
//! - GET /api/admin/events - Every event
//! - GET /api/admin/events/pending - Drafts awaiting publication
//! - GET /api/admin/events/:id/attendees - Attendees and bookings of one event
//! - POST /api/admin/events/:id/publish - Toggle Draft/Published
//! - POST /api/admin/users/:id/ban - Ban a regular user

use super::events::{EventResponse, render};
use crate::accounts::Account;
use crate::app::AttendeeView;
use crate::auth::middleware::RequireAdmin;
use crate::server::state::AppState;
use crate::types::{EventId, UserId};
use axum::{
    Json,
    extract::{Path, State},
};
use eventbook_web::AppError;
use serde::Deserialize;

/// Request to ban a user.
#[derive(Debug, Deserialize)]
pub struct BanUserRequest {
    /// Reason recorded on the account
    pub reason: Option<String>,
}

/// Every event, newest first.
///
/// # Errors
///
/// Returns `AppError` if storage fails.
pub async fn all_events(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.service.all_events(&admin.actor()).await?;
    Ok(Json(render(&events, state.service.now())))
}

/// Drafts awaiting publication, oldest first.
///
/// # Errors
///
/// Returns `AppError` if storage fails.
pub async fn pending_events(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.service.pending_events(&admin.actor()).await?;
    Ok(Json(render(&events, state.service.now())))
}

/// Attendees and bookings of one event.
///
/// # Errors
///
/// Returns `AppError::not_found` for an unknown event.
pub async fn event_attendees(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<EventId>,
) -> Result<Json<AttendeeView>, AppError> {
    Ok(Json(state.service.attendees(&admin.actor(), id).await?))
}

/// Toggle an event between Draft and Published.
///
/// # Errors
///
/// Returns `AppError` for cancelled or already-started events.
pub async fn toggle_publish(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<EventId>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.service.toggle_publish(admin.actor(), id).await?;
    Ok(Json(EventResponse::new(&event, state.service.now())))
}

/// Ban a regular user. The body is optional.
///
/// # Errors
///
/// Returns `AppError` when banning yourself or an admin, or for an unknown user.
pub async fn ban_user(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<UserId>,
    body: Option<Json<BanUserRequest>>,
) -> Result<Json<Account>, AppError> {
    let reason = body.and_then(|Json(request)| request.reason);
    Ok(Json(state.service.ban_user(&admin.actor(), id, reason).await?))
}

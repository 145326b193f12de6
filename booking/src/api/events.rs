//! Event management API endpoints.
//!
//! - GET /api/events - List published events with pagination
//! - POST /api/events - Create a new event
//! - GET /api/events/:id - Get event details
//! - PUT /api/events/:id - Update event (creator or admin)
//! - DELETE /api/events/:id - Delete event (creator or admin, no attendees)
//! - POST /api/events/:id/cancel - Cancel event (creator or admin)

use crate::auth::middleware::SessionUser;
use crate::server::state::AppState;
use crate::types::{
    Event, EventDraft, EventId, EventPatch, PublicationState, ScheduleStatus, TicketType, UserId,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use eventbook_web::AppError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Event details response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Event ID
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// Category
    pub category: String,
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Location
    pub location: String,
    /// Event start time
    pub start_time: DateTime<Utc>,
    /// Event end time
    pub end_time: DateTime<Utc>,
    /// Soft attendee cap
    pub max_attendees: u32,
    /// Distinct attendees
    pub attendee_count: u64,
    /// Ticket tiers with remaining inventory
    pub ticket_types: Vec<TicketType>,
    /// Publication state
    pub state: PublicationState,
    /// Derived schedule status
    pub status: ScheduleStatus,
    /// Featured flag
    pub is_featured: bool,
    /// Creator
    pub created_by: UserId,
    /// Cancellation reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Cancellation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    /// Render `event` as seen at time `now`.
    #[must_use]
    pub fn new(event: &Event, now: DateTime<Utc>) -> Self {
        Self {
            id: event.id(),
            title: event.title().to_string(),
            description: event.description().to_string(),
            category: event.category().to_string(),
            kind: event.kind().to_string(),
            location: event.location().to_string(),
            start_time: event.start_time(),
            end_time: event.end_time(),
            max_attendees: event.max_attendees(),
            attendee_count: event.attendee_count(),
            ticket_types: event.ticket_types().to_vec(),
            state: event.state(),
            status: event.schedule_status(now),
            is_featured: event.is_featured(),
            created_by: event.created_by(),
            cancellation_reason: event.cancellation_reason().map(str::to_string),
            cancelled_at: event.cancelled_at(),
            created_at: event.created_at(),
            updated_at: event.updated_at(),
        }
    }
}

/// Render a list of events at time `now`.
pub(crate) fn render(events: &[Event], now: DateTime<Utc>) -> Vec<EventResponse> {
    events.iter().map(|event| EventResponse::new(event, now)).collect()
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    /// Page number (0-indexed)
    #[serde(default)]
    pub page: usize,
    /// Page size (default: 20, max: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Filter by category
    pub category: Option<String>,
}

const fn default_page_size() -> usize {
    20
}

/// Response for listing events.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    /// Events on this page
    pub events: Vec<EventResponse>,
    /// Total count of matching events
    pub total: usize,
    /// Current page
    pub page: usize,
    /// Page size
    pub page_size: usize,
}

/// Request to cancel an event.
#[derive(Debug, Deserialize)]
pub struct CancelEventRequest {
    /// Reason shown to attendees
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List published events, soonest first.
///
/// # Errors
///
/// Returns `AppError` if storage fails.
pub async fn list_events(
    State(state): State<AppState>,
    _session: SessionUser,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, AppError> {
    let page_size = query.page_size.clamp(1, 100);
    let events: Vec<Event> = state
        .service
        .published_events()
        .await?
        .into_iter()
        .filter(|event| {
            query
                .category
                .as_deref()
                .is_none_or(|category| event.category().eq_ignore_ascii_case(category))
        })
        .collect();

    let total = events.len();
    let page: Vec<Event> = events
        .into_iter()
        .skip(query.page.saturating_mul(page_size))
        .take(page_size)
        .collect();

    Ok(Json(ListEventsResponse {
        events: render(&page, state.service.now()),
        total,
        page: query.page,
        page_size,
    }))
}

/// Create an event. Admins may publish it immediately with `"publish": true`.
///
/// # Errors
///
/// Returns `AppError` for an invalid body or failed validation.
pub async fn create_event(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<EventDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    let Json(draft) = payload?;
    let event = state.service.create_event(session.actor(), draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventResponse::new(&event, state.service.now())),
    ))
}

/// Get one event. Drafts are visible only to their creator and admins.
///
/// # Errors
///
/// Returns `AppError::not_found` if the event does not exist or is hidden.
pub async fn get_event(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<EventId>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.service.event(&session.actor(), id).await?;
    Ok(Json(EventResponse::new(&event, state.service.now())))
}

/// Update an event.
///
/// # Errors
///
/// Returns `AppError` if the caller may not edit it or the patch is invalid.
pub async fn update_event(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<EventId>,
    payload: Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<EventResponse>, AppError> {
    let Json(patch) = payload?;
    let event = state.service.update_event(session.actor(), id, patch).await?;
    Ok(Json(EventResponse::new(&event, state.service.now())))
}

/// Delete an event.
///
/// # Errors
///
/// Returns `AppError` if the caller may not delete it or it has attendees.
pub async fn delete_event(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<EventId>,
) -> Result<StatusCode, AppError> {
    state.service.delete_event(session.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel an event. The body is optional.
///
/// # Errors
///
/// Returns `AppError` if the caller may not cancel it or it is already cancelled.
pub async fn cancel_event(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<EventId>,
    body: Option<Json<CancelEventRequest>>,
) -> Result<Json<EventResponse>, AppError> {
    let reason = body.and_then(|Json(request)| request.reason);
    let event = state
        .service
        .cancel_event(session.actor(), id, reason)
        .await?;
    Ok(Json(EventResponse::new(&event, state.service.now())))
}

//! Admin analysis endpoints.
//!
//! - GET /api/admin/analysis/revenue?startDate&endDate - Confirmed, paid revenue
//! - GET /api/admin/analysis/attendees?startDate&endDate - Attendee total
//! - GET /api/admin/analysis/bookings[?startDate&endDate] - Bookings by status
//! - GET /api/admin/analysis/total-users - Regular user count
//!
//! Figures are recomputed from a point-in-time snapshot on every request.

use crate::aggregates::{BookingBreakdown, DateRange};
use crate::auth::middleware::RequireAdmin;
use crate::server::state::AppState;
use crate::types::Money;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use eventbook_web::AppError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Date window for analysis queries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    /// Earliest event start
    pub start_date: Option<DateTime<Utc>>,
    /// Latest event end
    pub end_date: Option<DateTime<Utc>>,
}

impl AnalysisQuery {
    /// The window, if one was given.
    ///
    /// # Errors
    ///
    /// `400` if only one bound is given or `startDate` is after `endDate`.
    pub fn range(&self) -> Result<Option<DateRange>, AppError> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => DateRange::new(start, end)
                .map(Some)
                .ok_or_else(|| AppError::bad_request("startDate must not be after endDate")),
            _ => Err(AppError::bad_request(
                "startDate and endDate must be given together",
            )),
        }
    }

    fn required_range(&self) -> Result<DateRange, AppError> {
        self.range()?
            .ok_or_else(|| AppError::bad_request("startDate and endDate are required"))
    }
}

/// Revenue over a window.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueResponse {
    /// Revenue in cents
    pub total_revenue: Money,
    /// Window start
    pub start_date: DateTime<Utc>,
    /// Window end
    pub end_date: DateTime<Utc>,
}

/// Attendees over a window.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeesResponse {
    /// Sum of distinct attendees per event
    pub total_attendees: u64,
    /// Window start
    pub start_date: DateTime<Utc>,
    /// Window end
    pub end_date: DateTime<Utc>,
}

/// Number of regular users.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalUsersResponse {
    /// Accounts with the user role
    pub total_users: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Revenue from confirmed, paid bookings of events inside the window.
///
/// # Errors
///
/// Returns `AppError` for a missing or invalid window.
pub async fn revenue(
    State(state): State<AppState>,
    admin: RequireAdmin,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<RevenueResponse>, AppError> {
    let Query(query) = query?;
    let range = query.required_range()?;
    let total_revenue = state.service.total_revenue(&admin.actor(), &range).await?;
    Ok(Json(RevenueResponse {
        total_revenue,
        start_date: range.start,
        end_date: range.end,
    }))
}

/// Attendees of events inside the window.
///
/// # Errors
///
/// Returns `AppError` for a missing or invalid window.
pub async fn attendees(
    State(state): State<AppState>,
    admin: RequireAdmin,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let Query(query) = query?;
    let range = query.required_range()?;
    let total_attendees = state.service.total_attendees(&admin.actor(), &range).await?;
    Ok(Json(AttendeesResponse {
        total_attendees,
        start_date: range.start,
        end_date: range.end,
    }))
}

/// Bookings grouped by status, optionally limited to a window.
///
/// # Errors
///
/// Returns `AppError` for an invalid window.
pub async fn bookings(
    State(state): State<AppState>,
    admin: RequireAdmin,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<BookingBreakdown>, AppError> {
    let Query(query) = query?;
    let range = query.range()?;
    let breakdown = state
        .service
        .booking_breakdown(&admin.actor(), range.as_ref())
        .await?;
    Ok(Json(breakdown))
}

/// Number of regular (non-admin) users.
///
/// # Errors
///
/// Returns `AppError` if the account directory fails.
pub async fn total_users(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<Json<TotalUsersResponse>, AppError> {
    let total_users = state.service.total_users(&admin.actor()).await?;
    Ok(Json(TotalUsersResponse { total_users }))
}

//! Router configuration for the booking backend.

use super::state::AppState;
use crate::api::{admin, analytics, bookings, events, me};
use axum::{
    Router,
    routing::{get, post},
};
use eventbook_web::{correlation_id_layer, health_check, readiness_check};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Health probes are unauthenticated. Everything under `/api` resolves the
/// caller from the bearer token, and `/api/admin` additionally requires the
/// admin role.
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/events", get(admin::all_events))
        .route("/events/pending", get(admin::pending_events))
        .route("/events/:id/attendees", get(admin::event_attendees))
        .route("/events/:id/publish", post(admin::toggle_publish))
        .route("/users/:id/ban", post(admin::ban_user))
        .route("/analysis/revenue", get(analytics::revenue))
        .route("/analysis/attendees", get(analytics::attendees))
        .route("/analysis/bookings", get(analytics::bookings))
        .route("/analysis/total-users", get(analytics::total_users));

    let api_routes = Router::new()
        // Event management
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/cancel", post(events::cancel_event))
        // Bookings
        .route("/events/:id/book", post(bookings::book_tickets))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Caller
        .route("/me/events", get(me::my_events))
        .route("/me/bookings", get(me::my_bookings))
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<AppState>))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}

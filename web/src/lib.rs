//! Axum integration for Eventbook.
//!
//! The HTTP layer is the imperative shell around the booking reducers:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, bearer tokens
//! │  - Request parsing                      │  ← Correlation ids, tracing
//! │  - Response serialization               │  ← Error mapping
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Booking reducers                     │  ← No I/O
//! │  - Versioned aggregate updates          │  ← Atomic, retried on conflict
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives; the correlation layer tags it with an id
//! 2. **Extract** the caller and the JSON body
//! 3. **Dispatch** an action through the booking service
//! 4. **Map** the outcome (or [`AppError`]) to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use eventbook_web::{AppError, correlation_id_layer};
//! use axum::{Router, routing::post, Json};
//!
//! async fn book(
//!     State(state): State<AppState>,
//!     Path(event_id): Path<Uuid>,
//!     Json(request): Json<BookRequest>,
//! ) -> Result<Json<BookingResponse>, AppError> {
//!     let booking = state.service.book(event_id.into(), request.ticket_type_id, request.quantity).await?;
//!     Ok(Json(booking.into()))
//! }
//!
//! let app = Router::new()
//!     .route("/api/events/:id/book", post(book))
//!     .layer(correlation_id_layer())
//!     .with_state(app_state);
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::CorrelationId;
pub use handlers::health::{ReadinessProbe, health_check, readiness_check};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

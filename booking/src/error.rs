//! Booking error taxonomy and its HTTP mapping.
//!
//! Every variant except [`BookingError::Internal`] is an expected outcome the
//! caller can act on. Internal failures are logged with detail and reported to
//! clients as a generic 500.

use eventbook_core::StoreError;
use eventbook_runtime::DispatchError;
use eventbook_web::AppError;
use thiserror::Error;

/// Why a booking operation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Referenced event, ticket type, booking or user does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Caller is not allowed to touch the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Structurally invalid request.
    #[error("{0}")]
    InvalidInput(String),

    /// Not permitted in the resource's current lifecycle state.
    #[error("{0}")]
    InvalidState(String),

    /// Requested more tickets than remain.
    #[error("Requested {requested} tickets but only {available} available")]
    InsufficientInventory {
        /// Tickets requested
        requested: u64,
        /// Tickets remaining
        available: u32,
    },

    /// Request would push the user past the per-user cap.
    #[error("Requested {requested} tickets but already holding {already_held} of at most {max_per_user}")]
    QuotaExceeded {
        /// Tickets requested
        requested: u64,
        /// Confirmed tickets already held
        already_held: u32,
        /// Cap for this ticket type
        max_per_user: u32,
    },

    /// Every attempt at the atomic update lost a race.
    #[error("{resource} {id} is being modified concurrently; retry the request")]
    ConcurrencyConflict {
        /// Kind of resource
        resource: &'static str,
        /// Identifier
        id: String,
    },

    /// Storage failure or corrupt data.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`BookingError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Shorthand for [`BookingError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Shorthand for [`BookingError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Stable snake_case label, used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidState(_) => "invalid_state",
            Self::InsufficientInventory { .. } => "insufficient_inventory",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { id, .. } => Self::ConcurrencyConflict {
                resource: "aggregate",
                id,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<DispatchError<Self>> for BookingError {
    fn from(err: DispatchError<Self>) -> Self {
        match err {
            DispatchError::NotFound { kind, id } => Self::NotFound { resource: kind, id },
            DispatchError::Rejected(rejection) => rejection,
            DispatchError::Conflict { kind, id, .. } => Self::ConcurrencyConflict { resource: kind, id },
            DispatchError::Store(store) => store.into(),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound { resource, id } => Self::not_found(resource, id),
            BookingError::Forbidden(message) => Self::forbidden(message),
            BookingError::InvalidInput(message) => Self::bad_request(message),
            BookingError::InvalidState(message) => Self::conflict("INVALID_STATE", message),
            err @ BookingError::InsufficientInventory { .. } => {
                Self::conflict("INSUFFICIENT_INVENTORY", err.to_string())
            }
            err @ BookingError::QuotaExceeded { .. } => {
                Self::conflict("QUOTA_EXCEEDED", err.to_string())
            }
            err @ BookingError::ConcurrencyConflict { .. } => {
                Self::conflict("CONCURRENCY_CONFLICT", err.to_string())
            }
            BookingError::Internal(detail) => Self::internal(detail),
        }
    }
}

/// Result alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use eventbook_core::Version;

    #[test]
    fn http_mapping_covers_every_kind() {
        let cases = [
            (BookingError::not_found("event", "e1"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (BookingError::forbidden("no"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (BookingError::invalid_input("bad"), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (BookingError::invalid_state("late"), StatusCode::CONFLICT, "INVALID_STATE"),
            (
                BookingError::InsufficientInventory { requested: 4, available: 3 },
                StatusCode::CONFLICT,
                "INSUFFICIENT_INVENTORY",
            ),
            (
                BookingError::QuotaExceeded { requested: 1, already_held: 2, max_per_user: 2 },
                StatusCode::CONFLICT,
                "QUOTA_EXCEEDED",
            ),
            (
                BookingError::ConcurrencyConflict { resource: "event", id: "e1".into() },
                StatusCode::CONFLICT,
                "CONCURRENCY_CONFLICT",
            ),
            (
                BookingError::Internal("pool timed out".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let app: AppError = BookingError::Internal("password=hunter2".into()).into();
        assert!(!app.message().contains("hunter2"));
    }

    #[test]
    fn dispatch_errors_map_to_domain_kinds() {
        let conflict: BookingError = DispatchError::<BookingError>::Conflict {
            kind: "event",
            id: "e1".into(),
            attempts: 4,
        }
        .into();
        assert_eq!(conflict.kind(), "concurrency_conflict");

        let rejected: BookingError =
            DispatchError::Rejected(BookingError::invalid_state("cancelled")).into();
        assert_eq!(rejected, BookingError::invalid_state("cancelled"));

        let store: BookingError = DispatchError::<BookingError>::Store(StoreError::ConcurrencyConflict {
            id: "event-e1".into(),
            expected: Version::new(1),
            actual: Version::new(2),
        })
        .into();
        assert_eq!(store.kind(), "concurrency_conflict");

        let down: BookingError =
            DispatchError::<BookingError>::Store(StoreError::Database("down".into())).into();
        assert_eq!(down.kind(), "internal");
    }
}

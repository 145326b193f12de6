//! Application state for the booking HTTP server.

use crate::app::BookingService;
use crate::types::Event;
use axum::async_trait;
use axum::extract::FromRef;
use eventbook_postgres::PostgresStore;
use eventbook_web::ReadinessProbe;
use std::sync::Arc;

/// What the readiness probe checks.
#[derive(Clone)]
pub enum StorageProbe {
    /// In-process store; always ready
    Memory,
    /// `PostgreSQL` pool
    Postgres(PostgresStore<Event>),
}

/// Application state shared across all HTTP handlers.
///
/// It's cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Booking workflow, queries and admin operations
    pub service: Arc<BookingService>,
    /// Storage health check
    pub storage: StorageProbe,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: Arc<BookingService>, storage: StorageProbe) -> Self {
        Self { service, storage }
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.service.clone()
    }
}

#[async_trait]
impl ReadinessProbe for AppState {
    fn backend(&self) -> &'static str {
        match self.storage {
            StorageProbe::Memory => "memory",
            StorageProbe::Postgres(_) => "postgres",
        }
    }

    async fn probe(&self) -> Result<(), String> {
        match &self.storage {
            StorageProbe::Memory => Ok(()),
            StorageProbe::Postgres(store) => store.ping().await.map_err(|e| e.to_string()),
        }
    }
}

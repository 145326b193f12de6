//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, async_trait, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Something the service depends on that can be probed for readiness.
///
/// Implemented by application state so [`readiness_check`] can be mounted
/// directly on the application router.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Name reported in the readiness body (e.g. `"postgres"`).
    fn backend(&self) -> &'static str;

    /// `Err` with a short reason if the dependency is unusable.
    async fn probe(&self) -> Result<(), String>;
}

/// Liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness endpoint. Does not touch any dependency.
///
/// ```text
/// GET /health → 200 {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Storage backend name
    pub backend: String,
    /// Failure reason, if not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness endpoint.
///
/// - 200 OK: the storage backend answered
/// - 503 Service Unavailable: it did not
pub async fn readiness_check<S>(State(state): State<S>) -> (StatusCode, Json<ReadinessResponse>)
where
    S: ReadinessProbe + Clone + 'static,
{
    match state.probe().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                backend: state.backend().to_string(),
                error: None,
            }),
        ),
        Err(reason) => {
            tracing::warn!(backend = state.backend(), %reason, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    backend: state.backend().to_string(),
                    error: Some(reason),
                }),
            )
        }
    }
}

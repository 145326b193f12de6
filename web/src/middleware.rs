//! Correlation id middleware.
//!
//! Every request gets an id: the one the client sent in `X-Correlation-ID`,
//! or a fresh UUID. The id is stored in the request extensions, recorded on
//! the request's tracing span and echoed back in the response header, so a
//! booking failure reported by a client can be found in the logs.
//!
//! ```ignore
//! use axum::Router;
//! use eventbook_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/api/events", get(list_events))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Read the correlation id stored by [`correlation_id_layer`].
pub trait CorrelationIdExt {
    /// `None` if the layer is not installed.
    fn correlation_id(&self) -> Option<Uuid>;
}

impl<B> CorrelationIdExt for axum::http::Request<B> {
    fn correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use axum_test::TestServer;

    fn app() -> Router {
        async fn echo(req: Request<Body>) -> String {
            req.correlation_id().map(|id| id.to_string()).unwrap_or_default()
        }

        Router::new()
            .route("/echo", get(echo))
            .layer(correlation_id_layer())
    }

    #[tokio::test]
    async fn generated_id_is_echoed_in_header_and_extensions() {
        let server = TestServer::new(app()).unwrap();

        let response = server.get("/echo").await;

        let header = response.header(CORRELATION_ID_HEADER);
        let header = header.to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
        assert_eq!(response.text(), header);
    }

    #[tokio::test]
    async fn client_id_is_preserved() {
        let server = TestServer::new(app()).unwrap();
        let id = Uuid::new_v4();

        let response = server
            .get("/echo")
            .add_header(
                axum::http::HeaderName::from_static("x-correlation-id"),
                HeaderValue::from_str(&id.to_string()).unwrap(),
            )
            .await;

        assert_eq!(response.text(), id.to_string());
    }

    #[tokio::test]
    async fn malformed_id_is_replaced() {
        let server = TestServer::new(app()).unwrap();

        let response = server
            .get("/echo")
            .add_header(
                axum::http::HeaderName::from_static("x-correlation-id"),
                HeaderValue::from_static("not-a-uuid"),
            )
            .await;

        assert_ne!(response.text(), "not-a-uuid");
        assert!(Uuid::parse_str(&response.text()).is_ok());
    }
}

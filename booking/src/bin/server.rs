//! Event booking HTTP server.
//!
//! Reads configuration from the environment (and `.env`), installs the
//! Prometheus exporter, selects the storage backend and serves the API until
//! Ctrl+C or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! # In-memory storage with seeded accounts
//! ACCOUNTS_FILE=booking/accounts.example.json cargo run --bin booking-server
//!
//! # PostgreSQL storage
//! STORAGE_BACKEND=postgres DATABASE_URL=postgres://localhost/booking \
//!     cargo run --bin booking-server
//! ```

use anyhow::Context;
use booking::{
    BookingService, Config, InMemoryAccounts, StorageBackend,
    metrics::register_business_metrics,
    server::{AppState, build_router, shutdown_signal, state::StorageProbe},
    types::Event,
};
use eventbook_core::environment::SystemClock;
use eventbook_core::store::AggregateStore;
use eventbook_postgres::PostgresStore;
use eventbook_runtime::memory::InMemoryStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting event booking server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        backend = ?config.storage.backend,
        address = %config.bind_address(),
        max_retries = config.booking.max_retries,
        "Configuration loaded"
    );

    let metrics_address: SocketAddr = config
        .metrics_address()
        .parse()
        .context("invalid metrics address")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_address)
        .install()
        .context("failed to install Prometheus exporter")?;
    register_business_metrics();
    info!(address = %metrics_address, "Metrics exporter listening");

    let (backend, storage): (Arc<dyn AggregateStore<Event>>, StorageProbe) =
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                (Arc::new(InMemoryStore::<Event>::new()), StorageProbe::Memory)
            }
            StorageBackend::Postgres => {
                let url = config
                    .storage
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let store =
                    PostgresStore::<Event>::connect_with(url, config.storage.max_connections)
                        .await
                        .context("failed to connect to PostgreSQL")?;
                store.migrate().await.context("failed to run migrations")?;
                info!("PostgreSQL connected and migrated");
                (Arc::new(store.clone()), StorageProbe::Postgres(store))
            }
        };

    let accounts = match &config.auth.accounts_file {
        Some(path) => {
            let accounts = InMemoryAccounts::from_file(path)
                .with_context(|| format!("failed to load accounts from {}", path.display()))?;
            info!(path = %path.display(), "Accounts loaded");
            accounts
        }
        None => {
            warn!("ACCOUNTS_FILE not set; no account can authenticate");
            InMemoryAccounts::new()
        }
    };

    let service = BookingService::with_backend(
        backend,
        Arc::new(SystemClock),
        Arc::new(accounts),
        config.booking.retry_policy(),
    );
    let app = build_router(AppState::new(Arc::new(service), storage));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Server listening");

    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let stop = Arc::clone(&stop);
        async move { stop.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut server => {
            result.context("server task failed")??;
        }
        () = shutdown_signal() => {
            stop.notify_one();
            let grace = Duration::from_secs(config.server.shutdown_timeout);
            match tokio::time::timeout(grace, server).await {
                Ok(result) => result.context("server task failed")??,
                Err(_) => warn!(seconds = grace.as_secs(), "Shutdown timed out; dropping connections"),
            }
        }
    }

    info!("Server stopped");
    Ok(())
}

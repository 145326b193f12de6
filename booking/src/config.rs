//! Configuration management for the booking server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unset variables fall back to their default; set but unparseable ones are
//! an error rather than being silently ignored.

use eventbook_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        reason: String,
    },

    /// A variable required by the chosen options is missing
    #[error("Missing required variable {0}")]
    Missing(&'static str),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Where events are stored
    pub storage: StorageConfig,
    /// Booking workflow tuning
    pub booking: BookingConfig,
    /// Account directory configuration
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on restart
    Memory,
    /// `PostgreSQL` JSONB documents
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("expected memory or postgres, got {other}")),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use
    pub backend: StorageBackend,
    /// `PostgreSQL` connection URL (required for the postgres backend)
    pub database_url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Retry budget for conflicting event updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// First backoff delay in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,
}

impl BookingConfig {
    /// Retry policy for the event store runtime.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .build()
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JSON file seeding the account directory; empty directory if unset
    pub accounts_file: Option<PathBuf>,
}

fn var<F>(lookup: &F, key: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(lookup, key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value or the
    /// postgres backend is chosen without `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = StorageConfig {
            backend: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Memory)?,
            database_url: var(&lookup, "DATABASE_URL"),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        };
        if storage.backend == StorageBackend::Postgres && storage.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let defaults = RetryPolicy::default();

        Ok(Self {
            server: ServerConfig {
                host: var(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8080)?,
                metrics_host: var(&lookup, "METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                metrics_port: parse_or(&lookup, "METRICS_PORT", 9090)?,
                shutdown_timeout: parse_or(&lookup, "SHUTDOWN_TIMEOUT", 30)?,
            },
            storage,
            booking: BookingConfig {
                max_retries: parse_or(&lookup, "BOOKING_MAX_RETRIES", defaults.max_retries)?,
                initial_delay_ms: parse_or(
                    &lookup,
                    "BOOKING_RETRY_INITIAL_DELAY_MS",
                    u64::try_from(defaults.initial_delay.as_millis()).unwrap_or(10),
                )?,
                max_delay_ms: parse_or(
                    &lookup,
                    "BOOKING_RETRY_MAX_DELAY_MS",
                    u64::try_from(defaults.max_delay.as_millis()).unwrap_or(250),
                )?,
            },
            auth: AuthConfig {
                accounts_file: var(&lookup, "ACCOUNTS_FILE").map(PathBuf::from),
            },
        })
    }

    /// `host:port` for the HTTP listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// `host:port` for the Prometheus listener.
    #[must_use]
    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.server.metrics_host, self.server.metrics_port)
    }
}

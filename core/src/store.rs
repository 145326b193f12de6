//! Aggregate store trait and related types.
//!
//! An aggregate store persists whole aggregates (one document per aggregate
//! instance) together with a [`Version`] stamp. Writes are conditional on the
//! version the writer read, which gives optimistic concurrency control:
//!
//! - `save(aggregate, expected)` succeeds only if the stored version equals
//!   `expected` (or, for `Version::initial()`, if nothing is stored yet)
//! - otherwise it fails with [`StoreError::ConcurrencyConflict`] and the
//!   caller reloads, re-validates and tries again
//!
//! # Implementations
//!
//! - `InMemoryStore` (in `eventbook-runtime`): single-process deployments and tests
//! - `PostgresStore` (in `eventbook-postgres`): JSONB documents with a version column

use crate::version::Version;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored version no longer matches the version the writer read.
    #[error("Concurrency conflict on {id}: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Aggregate the conflict occurred on.
        id: String,
        /// The version the writer expected.
        expected: Version,
        /// The version actually stored (`v0` if the aggregate is gone).
        actual: Version,
    },

    /// Backend connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns `true` if retrying the read-modify-write cycle may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// A consistency boundary persisted as a single document.
pub trait Aggregate: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Strongly typed identifier of the aggregate.
    type Id: Copy
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Send
        + Sync
        + From<Uuid>
        + Into<Uuid>
        + 'static;

    /// Short name of the aggregate kind (used as a storage discriminator).
    const KIND: &'static str;

    /// Identifier of this instance.
    fn id(&self) -> Self::Id;

    /// Identifiers of child entities embedded in this aggregate.
    ///
    /// Stores index these so a child can be resolved to its parent without
    /// scanning every document.
    fn child_ids(&self) -> Vec<Uuid> {
        Vec::new()
    }
}

/// An aggregate together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<A> {
    /// Version of the stored document.
    pub version: Version,
    /// The aggregate itself.
    pub aggregate: A,
}

impl<A> Versioned<A> {
    /// Pair an aggregate with a version.
    #[must_use]
    pub const fn new(version: Version, aggregate: A) -> Self {
        Self { version, aggregate }
    }
}

/// Boxed future returned by [`AggregateStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Versioned document storage for one aggregate kind.
///
/// # Dyn Compatibility
///
/// Methods return [`StoreFuture`] rather than using `async fn` so the store
/// can be shared as `Arc<dyn AggregateStore<A>>`.
pub trait AggregateStore<A: Aggregate>: Send + Sync {
    /// Load one aggregate, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Database`/`Serialization` errors from the backend.
    fn load(&self, id: A::Id) -> StoreFuture<'_, Option<Versioned<A>>>;

    /// Conditionally write an aggregate.
    ///
    /// `expected` is the version the caller read; `Version::initial()` creates
    /// a new document. Returns the new version.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the stored version differs from `expected`
    /// - `Database`/`Serialization`: backend failure
    fn save(&self, aggregate: A, expected: Version) -> StoreFuture<'_, Version>;

    /// Conditionally delete an aggregate.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the stored version differs from `expected`
    /// - `Database`: backend failure
    fn delete(&self, id: A::Id, expected: Version) -> StoreFuture<'_, ()>;

    /// Point-in-time listing of every aggregate of this kind.
    ///
    /// # Errors
    ///
    /// Returns `Database`/`Serialization` errors from the backend.
    fn load_all(&self) -> StoreFuture<'_, Vec<Versioned<A>>>;

    /// Find the aggregate that embeds the given child entity.
    ///
    /// # Errors
    ///
    /// Returns `Database` errors from the backend.
    fn locate_child(&self, child_id: Uuid) -> StoreFuture<'_, Option<A::Id>>;
}

//! # Eventbook Runtime
//!
//! Runs reducers against stored aggregates with an atomic
//! read → validate → write cycle.
//!
//! ## How a dispatch works
//!
//! ```text
//! send(id, action)
//!   ├─ acquire the per-aggregate lock (serialises writers in this process)
//!   └─ loop (bounded by RetryPolicy)
//!        ├─ load aggregate + version
//!        ├─ reducer.reduce(&mut copy, action)     ── Err → return, nothing written
//!        └─ store.save(copy, expected = version)
//!             ├─ Ok                   → return output
//!             └─ ConcurrencyConflict  → back off, reload, re-validate
//! ```
//!
//! The lock keeps writers inside one process from ever conflicting; the
//! version check on save catches writers in other processes sharing the same
//! database. A conflict that outlives the retry budget is surfaced as
//! [`DispatchError::Conflict`], never silently dropped.
//!
//! ## Example
//!
//! ```ignore
//! use eventbook_runtime::{Store, memory::InMemoryStore, retry::RetryPolicy};
//!
//! let store = Store::new(EventReducer, environment, Arc::new(InMemoryStore::new()), RetryPolicy::default());
//! store.create(event).await?;
//! let outcome = store.send(event_id, EventAction::Book { .. }).await?;
//! ```

use eventbook_core::reducer::Reducer;
use eventbook_core::{Aggregate, AggregateStore, StoreError, Version, Versioned};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// In-memory aggregate store
pub mod memory;

/// Retry logic with exponential backoff
pub mod retry;

pub use retry::RetryPolicy;

/// Errors that can occur while dispatching an action
pub mod error {
    use eventbook_core::StoreError;
    use thiserror::Error;

    /// Failure modes of [`crate::Store`] operations.
    #[derive(Error, Debug)]
    pub enum DispatchError<E> {
        /// The target aggregate does not exist.
        #[error("{kind} {id} not found")]
        NotFound {
            /// Aggregate kind
            kind: &'static str,
            /// Aggregate identifier
            id: String,
        },

        /// The reducer refused the action.
        #[error("{0}")]
        Rejected(E),

        /// Every attempt lost the race against a concurrent writer.
        #[error("{kind} {id} still conflicting after {attempts} attempts")]
        Conflict {
            /// Aggregate kind
            kind: &'static str,
            /// Aggregate identifier
            id: String,
            /// Number of attempts made
            attempts: usize,
        },

        /// The backing store failed.
        #[error(transparent)]
        Store(#[from] StoreError),
    }
}

pub use error::DispatchError;

/// Per-aggregate async mutexes, created on demand and dropped when idle.
struct AggregateLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: Copy + Eq + std::hash::Hash> AggregateLocks<K> {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: K) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Drop the entry for `key` if nobody else holds or awaits it.
    fn release(&self, key: K, handle: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in `handle`.
        if Arc::strong_count(&handle) <= 2 {
            locks.remove(&key);
        }
    }
}

/// Runtime that applies a reducer to stored aggregates.
///
/// # Type Parameters
///
/// - `R`: reducer whose state is a storable [`Aggregate`]
pub struct Store<R>
where
    R: Reducer,
    R::State: Aggregate,
{
    reducer: R,
    environment: R::Environment,
    backend: Arc<dyn AggregateStore<R::State>>,
    policy: RetryPolicy,
    locks: AggregateLocks<<R::State as Aggregate>::Id>,
}

impl<R> Store<R>
where
    R: Reducer,
    R::State: Aggregate,
    R::Action: Clone,
{
    /// Creates a new store runtime.
    #[must_use]
    pub fn new(
        reducer: R,
        environment: R::Environment,
        backend: Arc<dyn AggregateStore<R::State>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            reducer,
            environment,
            backend,
            policy,
            locks: AggregateLocks::new(),
        }
    }

    /// The injected environment.
    pub const fn environment(&self) -> &R::Environment {
        &self.environment
    }

    /// The retry policy used for conflicting saves.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Persist a brand-new aggregate.
    ///
    /// # Errors
    ///
    /// Returns `Store(ConcurrencyConflict)` if an aggregate with the same id exists.
    #[tracing::instrument(skip_all, fields(kind = R::State::KIND, id = %aggregate.id()))]
    pub async fn create(&self, aggregate: R::State) -> Result<Version, DispatchError<R::Error>> {
        let version = self.backend.save(aggregate, Version::initial()).await?;
        tracing::debug!(%version, "Aggregate created");
        Ok(version)
    }

    /// Apply `action` to the aggregate `id` atomically.
    ///
    /// The reducer runs against a private copy; the copy is written back only
    /// if the stored version is still the one that was read.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no aggregate with this id
    /// - `Rejected`: the reducer refused the action (nothing was written)
    /// - `Conflict`: the retry budget ran out
    /// - `Store`: backend failure
    #[tracing::instrument(skip_all, fields(kind = R::State::KIND, id = %id))]
    pub async fn send(
        &self,
        id: <R::State as Aggregate>::Id,
        action: R::Action,
    ) -> Result<R::Output, DispatchError<R::Error>> {
        let handle = self.locks.handle(id);
        let result = {
            let _guard = handle.lock().await;
            self.send_locked(id, action).await
        };
        self.locks.release(id, handle);
        result
    }

    async fn send_locked(
        &self,
        id: <R::State as Aggregate>::Id,
        action: R::Action,
    ) -> Result<R::Output, DispatchError<R::Error>> {
        let attempts = self.policy.max_attempts();

        for attempt in 0..attempts {
            let Some(Versioned {
                version,
                aggregate: mut state,
            }) = self.backend.load(id).await?
            else {
                return Err(DispatchError::NotFound {
                    kind: R::State::KIND,
                    id: id.to_string(),
                });
            };

            let output = self
                .reducer
                .reduce(&mut state, action.clone(), &self.environment)
                .map_err(DispatchError::Rejected)?;

            match self.backend.save(state, version).await {
                Ok(next) => {
                    tracing::trace!(%next, attempt, "Aggregate updated");
                    return Ok(output);
                }
                Err(StoreError::ConcurrencyConflict {
                    expected, actual, ..
                }) => {
                    metrics::counter!("eventbook_store_conflicts_total", "kind" => R::State::KIND)
                        .increment(1);
                    tracing::warn!(%expected, %actual, attempt, "Concurrent update detected");
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
                Err(other) => return Err(DispatchError::Store(other)),
            }
        }

        Err(DispatchError::Conflict {
            kind: R::State::KIND,
            id: id.to_string(),
            attempts,
        })
    }

    /// Delete the aggregate `id` if `check` accepts its current state.
    ///
    /// # Errors
    ///
    /// Same as [`Store::send`]; `check` failures come back as `Rejected`.
    #[tracing::instrument(skip_all, fields(kind = R::State::KIND, id = %id))]
    pub async fn delete_if<F>(
        &self,
        id: <R::State as Aggregate>::Id,
        check: F,
    ) -> Result<(), DispatchError<R::Error>>
    where
        F: Fn(&R::State, &R::Environment) -> Result<(), R::Error>,
    {
        let handle = self.locks.handle(id);
        let result = {
            let _guard = handle.lock().await;
            self.delete_locked(id, &check).await
        };
        self.locks.release(id, handle);
        result
    }

    async fn delete_locked<F>(
        &self,
        id: <R::State as Aggregate>::Id,
        check: &F,
    ) -> Result<(), DispatchError<R::Error>>
    where
        F: Fn(&R::State, &R::Environment) -> Result<(), R::Error>,
    {
        let attempts = self.policy.max_attempts();

        for attempt in 0..attempts {
            let Some(stored) = self.backend.load(id).await? else {
                return Err(DispatchError::NotFound {
                    kind: R::State::KIND,
                    id: id.to_string(),
                });
            };

            check(&stored.aggregate, &self.environment).map_err(DispatchError::Rejected)?;

            match self.backend.delete(id, stored.version).await {
                Ok(()) => return Ok(()),
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    metrics::counter!("eventbook_store_conflicts_total", "kind" => R::State::KIND)
                        .increment(1);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
                Err(other) => return Err(DispatchError::Store(other)),
            }
        }

        Err(DispatchError::Conflict {
            kind: R::State::KIND,
            id: id.to_string(),
            attempts,
        })
    }

    /// Current snapshot of one aggregate.
    ///
    /// # Errors
    ///
    /// Returns backend failures.
    pub async fn state(
        &self,
        id: <R::State as Aggregate>::Id,
    ) -> Result<Option<R::State>, StoreError> {
        Ok(self.backend.load(id).await?.map(|stored| stored.aggregate))
    }

    /// Point-in-time snapshot of every aggregate. Takes no locks.
    ///
    /// # Errors
    ///
    /// Returns backend failures.
    pub async fn snapshot(&self) -> Result<Vec<R::State>, StoreError> {
        Ok(self
            .backend
            .load_all()
            .await?
            .into_iter()
            .map(|stored| stored.aggregate)
            .collect())
    }

    /// Resolve a child entity id to the aggregate that embeds it.
    ///
    /// # Errors
    ///
    /// Returns backend failures.
    pub async fn locate(
        &self,
        child_id: Uuid,
    ) -> Result<Option<<R::State as Aggregate>::Id>, StoreError> {
        self.backend.locate_child(child_id).await
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use test_support::{Counter, CounterAction, CounterId, CounterReducer, OverLimit};

    fn new_store() -> (Store<CounterReducer>, Arc<InMemoryStore<Counter>>) {
        let backend = Arc::new(InMemoryStore::new());
        let store = Store::new(
            CounterReducer,
            (),
            Arc::clone(&backend) as Arc<dyn AggregateStore<Counter>>,
            RetryPolicy::default(),
        );
        (store, backend)
    }

    #[tokio::test]
    async fn send_applies_and_persists() {
        let counter = Counter::new(CounterId::from(Uuid::new_v4()));
        let (store, _) = new_store();
        store.create(counter.clone()).await.unwrap();

        assert_eq!(store.send(counter.id, CounterAction::Add(3)).await.unwrap(), 3);
        assert_eq!(store.send(counter.id, CounterAction::Add(4)).await.unwrap(), 7);
        assert_eq!(store.state(counter.id).await.unwrap().unwrap().value, 7);
    }

    #[tokio::test]
    async fn rejected_action_leaves_stored_state_untouched() {
        let mut counter = Counter::new(CounterId::from(Uuid::new_v4()));
        counter.limit = 5;
        let (store, backend) = new_store();
        store.create(counter.clone()).await.unwrap();

        let err = store.send(counter.id, CounterAction::Add(10)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(OverLimit)));

        let stored = backend.load(counter.id).await.unwrap().unwrap();
        assert_eq!(stored.aggregate.value, 0);
        assert_eq!(stored.version, Version::new(1));
    }

    #[tokio::test]
    async fn missing_aggregate_is_not_found() {
        let counter = Counter::new(CounterId::from(Uuid::new_v4()));
        let (store, _) = new_store();

        let err = store.send(counter.id, CounterAction::Add(1)).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { kind: "counter", .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_never_lose_updates() {
        let counter = Counter::new(CounterId::from(Uuid::new_v4()));
        let (store, _) = new_store();
        store.create(counter.clone()).await.unwrap();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.send(counter.id, CounterAction::Add(1)).await })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(store.state(counter.id).await.unwrap().unwrap().value, 50);
        assert!(store.locks.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_if_respects_check() {
        let counter = Counter::new(CounterId::from(Uuid::new_v4()));
        let (store, _) = new_store();
        store.create(counter.clone()).await.unwrap();
        store.send(counter.id, CounterAction::Add(2)).await.unwrap();

        let refused = store
            .delete_if(counter.id, |state, ()| if state.value == 0 { Ok(()) } else { Err(OverLimit) })
            .await;
        assert!(matches!(refused, Err(DispatchError::Rejected(OverLimit))));

        store.delete_if(counter.id, |_, ()| Ok(())).await.unwrap();
        assert!(store.state(counter.id).await.unwrap().is_none());
    }
}

//! In-memory aggregate store.
//!
//! Holds every aggregate in a `HashMap` behind an `RwLock`. The version check
//! and the write happen under the same write guard, so the compare-and-swap
//! is atomic within the process.

use eventbook_core::{Aggregate, AggregateStore, StoreError, StoreFuture, Version, Versioned};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Versioned aggregate storage kept in process memory.
///
/// Suitable for single-instance deployments and tests. Documents are cloned
/// on the way in and out, so callers never share mutable state with the store.
#[derive(Debug)]
pub struct InMemoryStore<A: Aggregate> {
    documents: RwLock<HashMap<A::Id, Versioned<A>>>,
}

impl<A: Aggregate> Default for InMemoryStore<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregate> InMemoryStore<A> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn conflict(id: A::Id, expected: Version, actual: Version) -> StoreError {
        StoreError::ConcurrencyConflict {
            id: format!("{}-{id}", A::KIND),
            expected,
            actual,
        }
    }

    fn save_now(&self, aggregate: A, expected: Version) -> Result<Version, StoreError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = aggregate.id();
        let actual = documents
            .get(&id)
            .map_or(Version::initial(), |stored| stored.version);

        if actual != expected {
            return Err(Self::conflict(id, expected, actual));
        }

        let next = expected.next();
        documents.insert(id, Versioned::new(next, aggregate));
        Ok(next)
    }

    fn delete_now(&self, id: A::Id, expected: Version) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let actual = documents
            .get(&id)
            .map_or(Version::initial(), |stored| stored.version);

        if actual.is_initial() || actual != expected {
            return Err(Self::conflict(id, expected, actual));
        }

        documents.remove(&id);
        Ok(())
    }
}

impl<A: Aggregate> AggregateStore<A> for InMemoryStore<A> {
    fn load(&self, id: A::Id) -> StoreFuture<'_, Option<Versioned<A>>> {
        let found = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        Box::pin(async move { Ok(found) })
    }

    fn save(&self, aggregate: A, expected: Version) -> StoreFuture<'_, Version> {
        let result = self.save_now(aggregate, expected);
        Box::pin(async move { result })
    }

    fn delete(&self, id: A::Id, expected: Version) -> StoreFuture<'_, ()> {
        let result = self.delete_now(id, expected);
        Box::pin(async move { result })
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<Versioned<A>>> {
        let all: Vec<Versioned<A>> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        Box::pin(async move { Ok(all) })
    }

    fn locate_child(&self, child_id: Uuid) -> StoreFuture<'_, Option<A::Id>> {
        let found = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|stored| stored.aggregate.child_ids().contains(&child_id))
            .map(|stored| stored.aggregate.id());
        Box::pin(async move { Ok(found) })
    }
}

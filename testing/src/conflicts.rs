//! Conflict injection for exercising optimistic concurrency paths.

use eventbook_core::{Aggregate, AggregateStore, StoreFuture, Version, Versioned};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Wraps a store and makes the next `n` saves lose a race.
///
/// Before each sabotaged save a rival write is committed: the currently
/// stored document is written back unchanged, bumping its version. The
/// caller's save then fails with a genuine `ConcurrencyConflict` from the
/// inner store, exactly as if another process had committed first.
pub struct ConflictInjectingStore<A: Aggregate> {
    inner: Arc<dyn AggregateStore<A>>,
    remaining: AtomicUsize,
    saves: AtomicUsize,
}

impl<A: Aggregate> ConflictInjectingStore<A> {
    /// Sabotage the next `conflicts` saves that target an existing aggregate.
    #[must_use]
    pub fn new(inner: Arc<dyn AggregateStore<A>>, conflicts: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(conflicts),
            saves: AtomicUsize::new(0),
        }
    }

    /// Arm another `conflicts` sabotaged saves.
    pub fn inject(&self, conflicts: usize) {
        self.remaining.fetch_add(conflicts, Ordering::SeqCst);
    }

    /// Sabotaged saves still pending.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Saves attempted through this wrapper, including sabotaged ones.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<A: Aggregate> AggregateStore<A> for ConflictInjectingStore<A> {
    fn load(&self, id: A::Id) -> StoreFuture<'_, Option<Versioned<A>>> {
        self.inner.load(id)
    }

    fn save(&self, aggregate: A, expected: Version) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if !expected.is_initial() && self.take_conflict() {
                if let Some(current) = self.inner.load(aggregate.id()).await? {
                    self.inner.save(current.aggregate, current.version).await?;
                }
            }
            self.inner.save(aggregate, expected).await
        })
    }

    fn delete(&self, id: A::Id, expected: Version) -> StoreFuture<'_, ()> {
        self.inner.delete(id, expected)
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<Versioned<A>>> {
        self.inner.load_all()
    }

    fn locate_child(&self, child_id: Uuid) -> StoreFuture<'_, Option<A::Id>> {
        self.inner.locate_child(child_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eventbook_runtime::memory::InMemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct DocId(Uuid);

    impl From<Uuid> for DocId {
        fn from(value: Uuid) -> Self {
            Self(value)
        }
    }

    impl From<DocId> for Uuid {
        fn from(value: DocId) -> Self {
            value.0
        }
    }

    impl std::fmt::Display for DocId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Doc {
        id: DocId,
        body: String,
    }

    impl Aggregate for Doc {
        type Id = DocId;
        const KIND: &'static str = "doc";

        fn id(&self) -> DocId {
            self.id
        }
    }

    #[tokio::test]
    async fn sabotaged_save_conflicts_then_recovers() {
        let store = ConflictInjectingStore::new(Arc::new(InMemoryStore::<Doc>::new()), 1);
        let doc = Doc {
            id: DocId(Uuid::new_v4()),
            body: "first".to_string(),
        };

        // Creation is never sabotaged.
        assert_eq!(store.save(doc.clone(), Version::initial()).await.unwrap(), Version::new(1));

        let err = store.save(doc.clone(), Version::new(1)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.remaining(), 0);

        let current = store.load(doc.id).await.unwrap().unwrap();
        assert_eq!(current.version, Version::new(2));
        assert_eq!(store.save(doc, current.version).await.unwrap(), Version::new(3));
        assert_eq!(store.saves(), 3);
    }
}

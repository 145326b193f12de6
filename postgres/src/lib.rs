//! `PostgreSQL` aggregate store for Eventbook.
//!
//! Each aggregate is one row in the `aggregates` table: a JSONB document, a
//! version column and an array of embedded child ids. Writes are conditional
//! on the version the caller read:
//!
//! - create: `INSERT .. ON CONFLICT DO NOTHING`
//! - update: `UPDATE .. WHERE version = $expected`
//! - delete: `DELETE .. WHERE version = $expected`
//!
//! Zero affected rows means another writer committed first, reported as
//! [`StoreError::ConcurrencyConflict`].
//!
//! # Example
//!
//! ```ignore
//! use eventbook_postgres::PostgresStore;
//!
//! let store = PostgresStore::<Event>::connect("postgres://localhost/eventbook").await?;
//! store.migrate().await?;
//! ```

use eventbook_core::{Aggregate, AggregateStore, StoreError, StoreFuture, Version, Versioned};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::marker::PhantomData;
use uuid::Uuid;

/// Versioned JSONB document storage for one aggregate kind.
pub struct PostgresStore<A> {
    pool: PgPool,
    _kind: PhantomData<fn() -> A>,
}

impl<A> Clone for PostgresStore<A> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _kind: PhantomData,
        }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn to_db_version(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.value())
        .map_err(|_| StoreError::Database(format!("version {version} out of range")))
}

fn from_db_version(version: i64) -> Result<Version, StoreError> {
    u64::try_from(version)
        .map(Version::new)
        .map_err(|_| StoreError::Database(format!("negative version {version} stored")))
}

impl<A: Aggregate> PostgresStore<A> {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            _kind: PhantomData,
        }
    }

    /// Connect with a small default pool.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::connect_with(database_url, 10).await
    }

    /// Connect with an explicit pool size.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the connection cannot be established.
    pub async fn connect_with(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::from_pool(pool))
    }

    /// Apply the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the server does not answer.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_error)
    }

    async fn current_version(&self, id: Uuid) -> Result<Version, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM aggregates WHERE kind = $1 AND id = $2")
                .bind(A::KIND)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        row.map_or(Ok(Version::initial()), |(v,)| from_db_version(v))
    }

    async fn conflict(&self, id: Uuid, expected: Version) -> StoreError {
        match self.current_version(id).await {
            Ok(actual) => StoreError::ConcurrencyConflict {
                id: format!("{}-{id}", A::KIND),
                expected,
                actual,
            },
            Err(err) => err,
        }
    }

    fn decode(version: i64, data: serde_json::Value) -> Result<Versioned<A>, StoreError> {
        let aggregate =
            serde_json::from_value(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Versioned::new(from_db_version(version)?, aggregate))
    }

    async fn load_row(&self, id: Uuid) -> Result<Option<Versioned<A>>, StoreError> {
        let row: Option<(i64, serde_json::Value)> =
            sqlx::query_as("SELECT version, data FROM aggregates WHERE kind = $1 AND id = $2")
                .bind(A::KIND)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        row.map(|(version, data)| Self::decode(version, data))
            .transpose()
    }

    async fn save_row(&self, aggregate: A, expected: Version) -> Result<Version, StoreError> {
        let id: Uuid = aggregate.id().into();
        let child_ids = aggregate.child_ids();
        let data =
            serde_json::to_value(&aggregate).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = if expected.is_initial() {
            sqlx::query(
                r"
                INSERT INTO aggregates (kind, id, version, data, child_ids)
                VALUES ($1, $2, 1, $3, $4)
                ON CONFLICT (kind, id) DO NOTHING
                ",
            )
            .bind(A::KIND)
            .bind(id)
            .bind(&data)
            .bind(&child_ids)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r"
                UPDATE aggregates
                SET version = version + 1, data = $3, child_ids = $4, updated_at = now()
                WHERE kind = $1 AND id = $2 AND version = $5
                ",
            )
            .bind(A::KIND)
            .bind(id)
            .bind(&data)
            .bind(&child_ids)
            .bind(to_db_version(expected)?)
            .execute(&self.pool)
            .await
        }
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(self.conflict(id, expected).await);
        }

        tracing::trace!(kind = A::KIND, %id, %expected, "Aggregate row written");
        Ok(expected.next())
    }

    async fn delete_row(&self, id: Uuid, expected: Version) -> Result<(), StoreError> {
        let result =
            sqlx::query("DELETE FROM aggregates WHERE kind = $1 AND id = $2 AND version = $3")
                .bind(A::KIND)
                .bind(id)
                .bind(to_db_version(expected)?)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(self.conflict(id, expected).await);
        }
        Ok(())
    }

    async fn load_all_rows(&self) -> Result<Vec<Versioned<A>>, StoreError> {
        let rows: Vec<(i64, serde_json::Value)> = sqlx::query_as(
            "SELECT version, data FROM aggregates WHERE kind = $1 ORDER BY created_at, id",
        )
        .bind(A::KIND)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|(version, data)| Self::decode(version, data))
            .collect()
    }

    async fn locate_row(&self, child_id: Uuid) -> Result<Option<A::Id>, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM aggregates WHERE kind = $1 AND $2 = ANY(child_ids) LIMIT 1",
        )
        .bind(A::KIND)
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(|(id,)| A::Id::from(id)))
    }
}

impl<A: Aggregate> AggregateStore<A> for PostgresStore<A> {
    fn load(&self, id: A::Id) -> StoreFuture<'_, Option<Versioned<A>>> {
        Box::pin(self.load_row(id.into()))
    }

    fn save(&self, aggregate: A, expected: Version) -> StoreFuture<'_, Version> {
        Box::pin(self.save_row(aggregate, expected))
    }

    fn delete(&self, id: A::Id, expected: Version) -> StoreFuture<'_, ()> {
        Box::pin(self.delete_row(id.into(), expected))
    }

    fn load_all(&self) -> StoreFuture<'_, Vec<Versioned<A>>> {
        Box::pin(self.load_all_rows())
    }

    fn locate_child(&self, child_id: Uuid) -> StoreFuture<'_, Option<A::Id>> {
        Box::pin(self.locate_row(child_id))
    }
}

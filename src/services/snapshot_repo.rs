//! src/services/snapshot_repo.rs
//!
//! SnapshotRepository — durable storage for the scan store as one named JSON
//! blob in SQLite. The whole state is rewritten on every save, so the entry
//! table and the binding table can never drift apart on disk.

use crate::services::scan_store::ScanStore;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Name of the blob holding the scan store.
pub const STORE_BLOB_NAME: &str = "barcode-scan-storage";

/// Schema for the key/value blob table.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("snapshot `{name}` is not valid JSON: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Reads and writes named JSON blobs in the `kv_blobs` table.
#[derive(Clone)]
pub struct SnapshotRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    name: String,
}

impl SnapshotRepository {
    /// Repository for the default store blob.
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self::with_name(db, STORE_BLOB_NAME)
    }

    pub fn with_name(db: Arc<SqlitePool>, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the blob table if it does not exist yet.
    pub async fn ensure_schema(&self) -> SnapshotResult<()> {
        for stmt in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Load the stored state, or `None` if nothing was saved yet.
    pub async fn load(&self) -> SnapshotResult<Option<ScanStore>> {
        match self.load_raw().await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|source| SnapshotError::Corrupt {
                    name: self.name.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Overwrite the stored state with `store`.
    pub async fn save(&self, store: &ScanStore) -> SnapshotResult<()> {
        let body = serde_json::to_string(store).map_err(SnapshotError::Encode)?;

        sqlx::query(
            "INSERT INTO kv_blobs (name, body, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
        )
        .bind(&self.name)
        .bind(&body)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        debug!(
            blob = %self.name,
            bytes = body.len(),
            items = store.len(),
            "persisted scan store"
        );
        Ok(())
    }

    /// Copy the stored body, untouched, to a side blob named
    /// `<name>.corrupt-<epoch millis>` and return that name.
    pub async fn quarantine(&self) -> SnapshotResult<String> {
        let now = Utc::now();
        let side = format!("{}.corrupt-{}", self.name, now.timestamp_millis());

        sqlx::query(
            "INSERT INTO kv_blobs (name, body, updated_at)
             SELECT ?, body, ? FROM kv_blobs WHERE name = ?",
        )
        .bind(&side)
        .bind(now)
        .bind(&self.name)
        .execute(&*self.db)
        .await?;

        Ok(side)
    }

    /// Raw stored body, without decoding it.
    pub async fn load_raw(&self) -> SnapshotResult<Option<String>> {
        Ok(
            sqlx::query_scalar("SELECT body FROM kv_blobs WHERE name = ?")
                .bind(&self.name)
                .fetch_optional(&*self.db)
                .await?,
        )
    }
}

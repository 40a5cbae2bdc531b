#![allow(dead_code)]

use scan_history::services::{
    export_service::ExportService, scan_service::ScanService, snapshot_repo::SnapshotRepository,
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, sync::Arc};
use tempfile::TempDir;

/// Single-connection in-memory database; the pool keeps the connection alive.
pub async fn memory_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    Arc::new(pool)
}

/// File-backed database inside `dir`, so a second pool sees the same data.
pub async fn file_pool(dir: &Path) -> Arc<SqlitePool> {
    let url = format!("sqlite://{}", dir.join("scans.db").display());
    let options = SqliteConnectOptions::from_str(&url)
        .expect("sqlite url")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .expect("file sqlite");
    Arc::new(pool)
}

pub fn exports(dir: &TempDir) -> ExportService {
    ExportService::new(dir.path().join("exports"), dir.path().join("private"))
}

pub async fn service_on(pool: Arc<SqlitePool>, dir: &TempDir) -> ScanService {
    ScanService::load(SnapshotRepository::new(pool), exports(dir)).await
}

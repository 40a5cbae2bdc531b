//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks SQLite, write access to the export
//!   and private directories, and whether snapshot persistence has degraded

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs a lightweight query against SQLite (`SELECT 1`).
/// 2. Performs a best-effort write/read/delete in the export directory and in
///    the private fallback directory.
/// 3. Reports whether snapshot writes are currently failing.
///
/// HTTP 200 when SQLite and persistence are healthy and at least one export
/// directory is writable (an unwritable export directory alone only means
/// exports land in private storage). HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let db = &state.scans.repository().db;
    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&**db)
        .await
    {
        Ok(1) => (true, None::<String>),
        Ok(v) => (false, Some(format!("unexpected result: {}", v))),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let exports = state.scans.exports();
    let export_dir_check = write_check(&exports.export_dir).await;
    let private_dir_check = write_check(&exports.private_dir).await;

    let persistence_check = if state.scans.persistence_degraded() {
        (
            false,
            Some("snapshot writes failing, running memory-only".to_string()),
        )
    } else {
        (true, None)
    };

    let overall_ok = sqlite_check.0
        && (export_dir_check.0 || private_dir_check.0)
        && persistence_check.0;

    let mut checks = HashMap::new();
    for (name, (ok, error)) in [
        ("sqlite", sqlite_check),
        ("export_dir", export_dir_check),
        ("private_dir", private_dir_check),
        ("persistence", persistence_check),
    ] {
        checks.insert(name, CheckStatus { ok, error });
    }

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Write, read back and delete a small file in `dir`.
async fn write_check(dir: &Path) -> (bool, Option<String>) {
    let tmp_path = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    match fs::create_dir_all(dir).await {
        Err(e) => (false, Some(format!("could not create {}: {}", dir.display(), e))),
        Ok(_) => match fs::write(&tmp_path, b"readyz").await {
            Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
            Ok(_) => {
                let read_back = fs::read(&tmp_path).await;
                let _ = fs::remove_file(&tmp_path).await;
                match read_back {
                    Ok(bytes) if bytes == b"readyz" => (true, None),
                    Ok(_) => (false, Some("file content mismatch".to_string())),
                    Err(e) => (false, Some(format!("could not read tmp file: {}", e))),
                }
            }
        },
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

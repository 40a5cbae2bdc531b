//! Defines routes for scan history, metadata editing and export.
//!
//! ## Structure
//! - **History endpoints**
//!   - `POST   /scans` — record a scan (`{"content", "type"}`)
//!   - `GET    /scans` — list history (supports `?kind=all|qr|ear_tag`)
//!   - `DELETE /scans` — clear history (bound metadata is kept)
//!   - `GET    /scans/{id}` — fetch one entry
//!   - `DELETE /scans/{id}` — remove one entry
//!   - `PUT    /scans/{id}/metadata` — set or clear metadata
//!   - `GET    /events` — server-sent store change events
//!
//! - **Export endpoints**
//!   - `GET    /export.csv` — direct CSV download (`?variant=basic|enriched`)
//!   - `POST   /export` — write CSV to the export directory

use crate::{
    handlers::{
        export_handlers::{download_export, file_export},
        health_handlers::{healthz, readyz},
        scan_handlers::{
            clear_scans, create_scan, delete_scan, get_scan, list_scans, scan_events,
            update_metadata,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build and return the router for all scan history routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // History routes
        .route(
            "/scans",
            post(create_scan).get(list_scans).delete(clear_scans),
        )
        .route("/scans/{id}", get(get_scan).delete(delete_scan))
        .route("/scans/{id}/metadata", put(update_metadata))
        .route("/events", get(scan_events))
        // Export routes
        .route("/export.csv", get(download_export))
        .route("/export", post(file_export))
}

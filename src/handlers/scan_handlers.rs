//! HTTP handlers for scan ingestion, history and metadata editing.
//! All state changes are delegated to `ScanService`; handlers only validate
//! input and apply caller-side policy.

use crate::{
    errors::AppError,
    models::{barcode::ScanKind, metadata::MetadataRecord},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, stream};
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// Body of `POST /scans`, one accepted decode event.
#[derive(Debug, Deserialize)]
pub struct CreateScanReq {
    pub content: String,
    #[serde(rename = "type")]
    pub barcode_type: String,
}

/// Query params accepted by `GET /scans`.
#[derive(Debug, Deserialize)]
pub struct ListScansQuery {
    pub kind: Option<ScanKind>,
}

/// `POST /scans` — record a scan.
pub async fn create_scan(
    State(state): State<AppState>,
    Json(req): Json<CreateScanReq>,
) -> Result<impl IntoResponse, AppError> {
    if req.content.is_empty() {
        return Err(AppError::bad_request("scan content must not be empty"));
    }
    if req.barcode_type.is_empty() {
        return Err(AppError::bad_request("barcode type must not be empty"));
    }

    let entry = state.scans.add_item(&req.content, &req.barcode_type).await;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /scans?kind=all|qr|ear_tag` — history, newest first, with counts.
pub async fn list_scans(
    State(state): State<AppState>,
    Query(q): Query<ListScansQuery>,
) -> impl IntoResponse {
    Json(state.scans.list(q.kind.unwrap_or_default()).await)
}

/// `GET /scans/{id}`
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .scans
        .get_item(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("scan `{}` not found", id)))
}

/// `DELETE /scans/{id}` — always 204, unknown ids are ignored.
pub async fn delete_scan(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    state.scans.remove_item(id).await;
    StatusCode::NO_CONTENT
}

/// `DELETE /scans` — clear the history. Bound metadata is kept.
pub async fn clear_scans(State(state): State<AppState>) -> StatusCode {
    state.scans.clear_items().await;
    StatusCode::NO_CONTENT
}

/// `PUT /scans/{id}/metadata` — set or clear (with `null` or `{}`) metadata.
///
/// Ear-tag entries are refused unless the service is configured to allow
/// them. Unknown ids are ignored and still answer 204.
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(metadata): Json<Option<MetadataRecord>>,
) -> Result<StatusCode, AppError> {
    if let Some(entry) = state.scans.get_item(id).await {
        if !entry.is_qr() && !state.allow_ear_tag_metadata {
            return Err(AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!(
                    "metadata can only be edited on QR codes, `{}` is a {}",
                    id,
                    entry.type_label()
                ),
            ));
        }
    }

    state.scans.update_item(id, metadata).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /events` — server-sent stream of store changes.
pub async fn scan_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.scans.subscribe();
    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.event_type())
                        .json_data(&event)
                        .unwrap_or_else(|_| Event::default().comment("unencodable event"));
                    return Some((Ok(sse), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

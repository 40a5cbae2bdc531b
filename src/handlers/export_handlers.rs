//! HTTP handlers for CSV export: a direct download and a server-side file write.

use crate::{
    errors::AppError,
    services::{
        csv_export::CsvVariant,
        export_service::{ExportLocation, ExportOutcome},
    },
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Query params accepted by both export endpoints.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub variant: Option<CsvVariant>,
}

#[derive(Debug, Serialize)]
pub struct FileExportResponse {
    pub path: String,
    pub location: ExportLocation,
    pub rows: usize,
}

fn export_in_progress() -> AppError {
    AppError::new(StatusCode::CONFLICT, "an export is already in progress")
}

/// `GET /export.csv` — the CSV as an attachment download.
pub async fn download_export(
    State(state): State<AppState>,
    Query(q): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let rendered = state
        .scans
        .render_export(q.variant.unwrap_or_default())
        .await?
        .ok_or_else(export_in_progress)?;

    let disposition = format!("attachment; filename=\"{}\"", rendered.file_name);
    let mut response = Response::new(Body::from(rendered.csv));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

/// `POST /export` — write the CSV into the export directory, or the private
/// directory when the export directory is not writable.
pub async fn file_export(
    State(state): State<AppState>,
    Query(q): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    match state
        .scans
        .export_to_file(q.variant.unwrap_or_default())
        .await?
    {
        ExportOutcome::Written {
            path,
            location,
            rows,
        } => Ok((
            StatusCode::CREATED,
            Json(FileExportResponse {
                path: path.display().to_string(),
                location,
                rows,
            }),
        )),
        ExportOutcome::Skipped => Err(export_in_progress()),
    }
}

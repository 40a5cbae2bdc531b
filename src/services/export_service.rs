//! src/services/export_service.rs
//!
//! ExportService delivers rendered CSV either as a file in the export
//! directory (falling back to the private directory) or as text for a direct
//! download. An export started while another runs is a no-op.

use crate::{
    models::scan_entry::ScanEntry,
    services::csv_export::{CsvVariant, export_file_name, generate_csv},
};
use chrono::Utc;
use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there are no scans to export")]
    NothingToExport,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(
        "could not write export to {} nor to {}: {source}; please try again",
        .preferred.display(),
        .fallback.display()
    )]
    Io {
        preferred: PathBuf,
        fallback: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Where a file export ended up.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportLocation {
    /// The configured, user-accessible export directory.
    Preferred,
    /// The private directory used when the preferred one is not writable.
    Private,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Written {
        path: PathBuf,
        location: ExportLocation,
        rows: usize,
    },
    /// Another export was in flight; nothing was done.
    Skipped,
}

/// A rendered export ready to be handed to a download.
#[derive(Debug)]
pub struct RenderedExport {
    pub file_name: String,
    pub csv: String,
}

#[derive(Clone)]
pub struct ExportService {
    pub export_dir: PathBuf,
    pub private_dir: PathBuf,
    busy: Arc<AtomicBool>,
}

/// Holds the busy flag for the lifetime of one export.
///
/// The flag is released on drop, so a request future that is dropped midway
/// frees it as well.
pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl ExportService {
    pub fn new(export_dir: impl Into<PathBuf>, private_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            private_dir: private_dir.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the busy flag, or `None` when an export is already running.
    pub fn try_begin(&self) -> Option<ExportGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Render `entries` for a direct download. `None` when busy.
    pub fn render(
        &self,
        entries: &[ScanEntry],
        variant: CsvVariant,
    ) -> ExportResult<Option<RenderedExport>> {
        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let Some(_guard) = self.try_begin() else {
            info!("export already in progress, ignoring download request");
            return Ok(None);
        };

        let csv = generate_csv(entries, variant)?;
        Ok(Some(RenderedExport {
            file_name: export_file_name(Utc::now()),
            csv,
        }))
    }

    /// Render `entries` and write them to disk.
    ///
    /// Tries the export directory first and the private directory second.
    pub async fn export_to_file(
        &self,
        entries: &[ScanEntry],
        variant: CsvVariant,
    ) -> ExportResult<ExportOutcome> {
        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let Some(_guard) = self.try_begin() else {
            info!("export already in progress, ignoring file export request");
            return Ok(ExportOutcome::Skipped);
        };

        let csv = generate_csv(entries, variant)?;
        let file_name = export_file_name(Utc::now());
        let rows = entries.len();

        match write_file(&self.export_dir, &file_name, &csv).await {
            Ok(path) => {
                info!("export written to {}", path.display());
                return Ok(ExportOutcome::Written {
                    path,
                    location: ExportLocation::Preferred,
                    rows,
                });
            }
            Err(err) => warn!(
                "could not write export to {} ({}), falling back to {}",
                self.export_dir.display(),
                err,
                self.private_dir.display()
            ),
        }

        match write_file(&self.private_dir, &file_name, &csv).await {
            Ok(path) => {
                info!("export written to private storage at {}", path.display());
                Ok(ExportOutcome::Written {
                    path,
                    location: ExportLocation::Private,
                    rows,
                })
            }
            Err(source) => Err(ExportError::Io {
                preferred: self.export_dir.clone(),
                fallback: self.private_dir.clone(),
                source,
            }),
        }
    }
}

/// Write `contents` to `dir/file_name` through a synced temp file and rename.
///
/// An existing file is never replaced; a `-<n>` suffix is added instead.
async fn write_file(dir: &Path, file_name: &str, contents: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let final_path = free_path(dir, file_name).await?;
    let tmp_path = dir.join(format!(".tmp-{}", Uuid::new_v4()));

    let result = async {
        let mut file = File::create(&tmp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &final_path).await
    }
    .await;

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err);
    }
    Ok(final_path)
}

async fn free_path(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    let candidate = dir.join(file_name);
    if !fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let name = Path::new(file_name);
    let stem = name.file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
    let ext = name.extension().and_then(|e| e.to_str());
    for n in 1..1000u32 {
        let candidate = dir.join(match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        });
        if !fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}", file_name),
    ))
}

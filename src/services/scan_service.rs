//! src/services/scan_service.rs
//!
//! ScanService — the single owner of the scan store. Commands are applied to
//! the in-memory state, the whole state is persisted as one snapshot, and a
//! change event is published to subscribers.
//!
//! Persistence failures never fail a command: they are logged, the service is
//! marked degraded, and the in-memory state stays authoritative. A snapshot
//! that could not be read is never overwritten: a corrupt one is copied aside
//! first, and an unreadable one turns snapshot writes off for the session.

use crate::{
    models::{barcode::ScanKind, metadata::MetadataRecord, scan_entry::ScanEntry},
    services::{
        csv_export::CsvVariant,
        events::{EventBus, StoreEvent},
        export_service::{ExportOutcome, ExportResult, ExportService, RenderedExport},
        scan_store::{ScanCounts, ScanStore},
        snapshot_repo::{SnapshotError, SnapshotRepository},
    },
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Shared handle to the scan store, its persistence and its subscribers.
#[derive(Clone)]
pub struct ScanService {
    state: Arc<Mutex<ScanStore>>,
    repo: SnapshotRepository,
    events: EventBus,
    exports: ExportService,
    degraded: Arc<AtomicBool>,
    writable: bool,
}

/// Entries of one kind plus the counts for every kind.
#[derive(serde::Serialize, Debug)]
pub struct ScanListing {
    pub items: Vec<ScanEntry>,
    pub counts: ScanCounts,
    pub bindings: usize,
}

impl ScanService {
    /// Load persisted state (or start empty) and build the service.
    ///
    /// A missing table is created. A corrupt snapshot is copied to a side blob
    /// and the service starts empty. If the snapshot cannot be read at all, or
    /// the copy fails, the service starts empty in degraded mode and never
    /// writes the snapshot this session.
    pub async fn load(repo: SnapshotRepository, exports: ExportService) -> Self {
        let degraded = Arc::new(AtomicBool::new(false));
        let mut writable = true;

        if let Err(err) = repo.ensure_schema().await {
            warn!("could not prepare snapshot table: {}", err);
            degraded.store(true, Ordering::SeqCst);
        }

        let store = match repo.load().await {
            Ok(Some(store)) => {
                info!(
                    items = store.len(),
                    bindings = store.bindings_len(),
                    "loaded scan store snapshot `{}`",
                    repo.name()
                );
                store
            }
            Ok(None) => {
                debug!("no snapshot `{}` yet, starting empty", repo.name());
                ScanStore::new()
            }
            Err(err @ SnapshotError::Corrupt { .. }) => {
                match repo.quarantine().await {
                    Ok(side) => {
                        warn!("{}; kept a copy as `{}`, starting with an empty store", err, side)
                    }
                    Err(copy_err) => {
                        warn!(
                            "{}; could not keep a copy ({}), running memory-only",
                            err, copy_err
                        );
                        degraded.store(true, Ordering::SeqCst);
                        writable = false;
                    }
                }
                ScanStore::new()
            }
            Err(err) => {
                warn!("could not load snapshot: {}; running memory-only", err);
                degraded.store(true, Ordering::SeqCst);
                writable = false;
                ScanStore::new()
            }
        };

        Self {
            state: Arc::new(Mutex::new(store)),
            repo,
            events: EventBus::new(EVENT_CAPACITY),
            exports,
            degraded,
            writable,
        }
    }

    /// Record a scan. Metadata bound to identical content is attached.
    pub async fn add_item(&self, content: &str, barcode_type: &str) -> ScanEntry {
        let mut store = self.state.lock().await;
        let entry = store.add_item(content, barcode_type);
        info!(
            id = %entry.id,
            barcode_type,
            reattached = entry.metadata.is_some(),
            "scan recorded"
        );
        self.persist(&store).await;
        drop(store);

        self.events.emit(StoreEvent::ItemAdded {
            id: entry.id,
            content: entry.content.clone(),
        });
        entry
    }

    /// Remove one entry. Unknown ids are ignored.
    pub async fn remove_item(&self, id: Uuid) {
        let mut store = self.state.lock().await;
        if !store.remove_item(id) {
            debug!(%id, "remove ignored, no such entry");
            return;
        }
        self.persist(&store).await;
        drop(store);

        self.events.emit(StoreEvent::ItemRemoved { id });
    }

    /// Remove every entry; bindings are kept.
    pub async fn clear_items(&self) {
        let mut store = self.state.lock().await;
        let removed = store.clear_items();
        info!(removed, "scan history cleared");
        self.persist(&store).await;
        drop(store);

        self.events.emit(StoreEvent::ItemsCleared { removed });
    }

    /// Set an entry's metadata and rebind it to the entry's content.
    ///
    /// Returns `None`, changing nothing, when the id is unknown.
    pub async fn update_item(
        &self,
        id: Uuid,
        metadata: Option<MetadataRecord>,
    ) -> Option<ScanEntry> {
        let mut store = self.state.lock().await;
        let Some(entry) = store.update_item(id, metadata) else {
            debug!(%id, "update ignored, no such entry");
            return None;
        };
        self.persist(&store).await;
        drop(store);

        let bound = entry.metadata.is_some();
        info!(%id, bound, "scan metadata updated");
        self.events.emit(StoreEvent::ItemUpdated {
            id,
            content: entry.content.clone(),
            bound,
        });
        Some(entry)
    }

    /// All entries, newest first.
    pub async fn items(&self) -> Vec<ScanEntry> {
        self.state.lock().await.items().to_vec()
    }

    pub async fn get_item(&self, id: Uuid) -> Option<ScanEntry> {
        self.state.lock().await.get(id).cloned()
    }

    /// Entries of `kind` with per-kind counts, for the history view.
    pub async fn list(&self, kind: ScanKind) -> ScanListing {
        let store = self.state.lock().await;
        ScanListing {
            items: store.filter(kind),
            counts: store.counts(),
            bindings: store.bindings_len(),
        }
    }

    /// Metadata currently bound to `content`.
    pub async fn binding(&self, content: &str) -> Option<MetadataRecord> {
        self.state.lock().await.binding(content).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// True while snapshot writes are failing, or were turned off at load.
    pub fn persistence_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn repository(&self) -> &SnapshotRepository {
        &self.repo
    }

    pub fn exports(&self) -> &ExportService {
        &self.exports
    }

    /// Render the current history as CSV for a direct download.
    pub async fn render_export(&self, variant: CsvVariant) -> ExportResult<Option<RenderedExport>> {
        let items = self.items().await;
        self.exports.render(&items, variant)
    }

    /// Write the current history as a CSV file.
    pub async fn export_to_file(&self, variant: CsvVariant) -> ExportResult<ExportOutcome> {
        let items = self.items().await;
        self.exports.export_to_file(&items, variant).await
    }

    async fn persist(&self, store: &ScanStore) {
        if !self.writable {
            debug!("snapshot writes are off for this session");
            return;
        }
        match self.repo.save(store).await {
            Ok(()) => {
                if self.degraded.swap(false, Ordering::SeqCst) {
                    info!("snapshot persistence recovered");
                }
            }
            Err(err) => {
                if !self.degraded.swap(true, Ordering::SeqCst) {
                    warn!("could not persist scan store, continuing in memory: {}", err);
                } else {
                    debug!("snapshot still not persisted: {}", err);
                }
            }
        }
    }
}

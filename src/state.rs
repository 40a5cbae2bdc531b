//! Shared state handed to every HTTP handler.

use crate::services::scan_service::ScanService;

#[derive(Clone)]
pub struct AppState {
    pub scans: ScanService,

    /// Whether the edit endpoint accepts metadata for ear-tag entries.
    /// Off by default: only QR entries are editable.
    pub allow_ear_tag_metadata: bool,
}

impl AppState {
    pub fn new(scans: ScanService) -> Self {
        Self {
            scans,
            allow_ear_tag_metadata: false,
        }
    }

    pub fn with_ear_tag_metadata(mut self, allow: bool) -> Self {
        self.allow_ear_tag_metadata = allow;
        self
    }
}

//! Represents one recorded scan event.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::MetadataRecord;

/// Format of `display_date`, matching the German locale string the
/// history list has always shown.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";

/// A single scan in the history.
///
/// `content` is the decoded payload exactly as the scanner delivered it and is
/// never rewritten. `original_content` is a copy kept for export.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    /// Unique entry id, independent of content.
    pub id: Uuid,

    /// Raw decoded payload.
    pub content: String,

    /// Copy of `content` taken at creation time.
    pub original_content: String,

    /// When the scan was recorded.
    pub captured_at: DateTime<Utc>,

    /// `captured_at` rendered in local time for display and export.
    pub display_date: String,

    /// Scanner type tag (`qr`, `ean13`, ...).
    pub barcode_type: String,

    /// Set whenever metadata is edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataRecord>,
}

impl ScanEntry {
    /// Build a fresh entry for `content` captured at `captured_at`.
    pub fn new(content: &str, barcode_type: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            original_content: content.to_string(),
            captured_at,
            display_date: captured_at
                .with_timezone(&Local)
                .format(DISPLAY_DATE_FORMAT)
                .to_string(),
            barcode_type: barcode_type.to_string(),
            last_modified: None,
            metadata: None,
        }
    }

    pub fn is_qr(&self) -> bool {
        super::barcode::is_qr(&self.barcode_type)
    }

    pub fn type_label(&self) -> String {
        super::barcode::type_label(&self.barcode_type)
    }
}

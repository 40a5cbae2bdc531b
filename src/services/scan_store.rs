//! The in-memory entry table and the content-keyed binding table, kept in one
//! struct so they serialize as a single unit.

use crate::models::{barcode::ScanKind, metadata::MetadataRecord, scan_entry::ScanEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Scan history plus the metadata bound to content values.
///
/// Entries are kept newest-first. The binding table is keyed by the raw
/// content string (exact match, no normalisation) and never holds an empty
/// record.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanStore {
    #[serde(default)]
    items: Vec<ScanEntry>,

    #[serde(default)]
    binding_table: BTreeMap<String, MetadataRecord>,
}

/// Per-kind entry counts for the history view.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub all: usize,
    pub qr: usize,
    pub ear_tag: usize,
}

impl ScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scan captured now. See [`ScanStore::add_item_at`].
    pub fn add_item(&mut self, content: &str, barcode_type: &str) -> ScanEntry {
        self.add_item_at(content, barcode_type, Utc::now())
    }

    /// Record a scan and reattach any metadata bound to its content.
    ///
    /// The new entry is placed at the front of the history. The binding table
    /// is only read here.
    pub fn add_item_at(
        &mut self,
        content: &str,
        barcode_type: &str,
        captured_at: DateTime<Utc>,
    ) -> ScanEntry {
        let mut entry = ScanEntry::new(content, barcode_type, captured_at);
        entry.metadata = self.binding_table.get(content).cloned();
        self.items.insert(0, entry.clone());
        entry
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove_item(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Drop every entry. Bindings survive, since they belong to content.
    pub fn clear_items(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    /// Set an entry's metadata and rebind it to the entry's content.
    ///
    /// Empty or absent metadata clears both the entry's metadata and the
    /// binding for its content. Returns the updated entry, or `None` when the
    /// id is unknown (nothing changes in that case).
    pub fn update_item(
        &mut self,
        id: Uuid,
        metadata: Option<MetadataRecord>,
    ) -> Option<ScanEntry> {
        let metadata = metadata.and_then(MetadataRecord::normalized);
        let entry = self.items.iter_mut().find(|item| item.id == id)?;

        entry.metadata = metadata.clone();
        entry.last_modified = Some(Utc::now());

        match metadata {
            Some(record) => {
                self.binding_table.insert(entry.content.clone(), record);
            }
            None => {
                self.binding_table.remove(&entry.content);
            }
        }

        Some(entry.clone())
    }

    /// All entries, newest first.
    pub fn items(&self) -> &[ScanEntry] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&ScanEntry> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Entries of the given kind, preserving newest-first order.
    pub fn filter(&self, kind: ScanKind) -> Vec<ScanEntry> {
        self.items
            .iter()
            .filter(|item| kind.matches(&item.barcode_type))
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> ScanCounts {
        let qr = self.items.iter().filter(|item| item.is_qr()).count();
        ScanCounts {
            all: self.items.len(),
            qr,
            ear_tag: self.items.len() - qr,
        }
    }

    /// Metadata currently bound to `content`, if any.
    pub fn binding(&self, content: &str) -> Option<&MetadataRecord> {
        self.binding_table.get(content)
    }

    pub fn bindings_len(&self) -> usize {
        self.binding_table.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(notes: &str) -> MetadataRecord {
        MetadataRecord {
            animal_id: Some("DE0987".into()),
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_entries_are_prepended() {
        let mut store = ScanStore::new();
        let first = store.add_item("one", "qr");
        let second = store.add_item("two", "ean13");
        let ids: Vec<Uuid> = store.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn update_binds_metadata_to_content_for_later_scans() {
        let mut store = ScanStore::new();
        let entry = store.add_item("https://farm/cow/17", "qr");
        let updated = store.update_item(entry.id, Some(record("calm"))).unwrap();
        assert!(updated.last_modified.is_some());

        let again = store.add_item("https://farm/cow/17", "qr");
        assert_eq!(again.metadata, Some(record("calm")));
        assert_eq!(store.binding("https://farm/cow/17"), Some(&record("calm")));
    }

    #[test]
    fn reattachment_is_by_exact_content_only() {
        let mut store = ScanStore::new();
        let entry = store.add_item("0401234", "code128");
        store.update_item(entry.id, Some(record("x")));

        assert!(store.add_item("401234", "code128").metadata.is_none());
        assert!(store.add_item("0401234 ", "code128").metadata.is_none());
        assert!(store.add_item("0401234", "ean13").metadata.is_some());
    }

    #[test]
    fn clearing_metadata_removes_the_binding() {
        let mut store = ScanStore::new();
        let entry = store.add_item("abc", "qr");
        store.update_item(entry.id, Some(record("n")));
        let cleared = store.update_item(entry.id, None).unwrap();
        assert!(cleared.metadata.is_none());
        assert_eq!(store.bindings_len(), 0);
        assert!(store.add_item("abc", "qr").metadata.is_none());
    }

    #[test]
    fn empty_record_counts_as_no_metadata() {
        let mut store = ScanStore::new();
        let entry = store.add_item("abc", "qr");
        store.update_item(entry.id, Some(record("n")));
        let updated = store
            .update_item(entry.id, Some(MetadataRecord::default()))
            .unwrap();
        assert!(updated.metadata.is_none());
        assert!(store.binding("abc").is_none());
    }

    #[test]
    fn clear_items_keeps_bindings() {
        let mut store = ScanStore::new();
        let entry = store.add_item("abc", "qr");
        store.update_item(entry.id, Some(record("kept")));

        assert_eq!(store.clear_items(), 1);
        assert!(store.is_empty());
        assert_eq!(store.add_item("abc", "qr").metadata, Some(record("kept")));
    }

    #[test]
    fn earlier_entries_keep_their_snapshot() {
        let mut store = ScanStore::new();
        let first = store.add_item("abc", "qr");
        let second = store.add_item("abc", "qr");
        store.update_item(second.id, Some(record("new")));
        assert!(store.get(first.id).unwrap().metadata.is_none());
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut store = ScanStore::new();
        store.add_item("abc", "qr");
        assert!(!store.remove_item(Uuid::new_v4()));
        assert_eq!(store.len(), 1);
        assert!(store.update_item(Uuid::new_v4(), Some(record("n"))).is_none());
        assert_eq!(store.bindings_len(), 0);
    }

    #[test]
    fn remove_item_drops_only_that_entry() {
        let mut store = ScanStore::new();
        let keep = store.add_item("a", "qr");
        let gone = store.add_item("b", "qr");
        assert!(store.remove_item(gone.id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].id, keep.id);
    }

    #[test]
    fn filter_and_counts_by_kind() {
        let mut store = ScanStore::new();
        let t0 = Utc::now();
        store.add_item_at("q1", "qr", t0);
        store.add_item_at("e1", "ean13", t0 + Duration::seconds(1));
        store.add_item_at("q2", "qr", t0 + Duration::seconds(2));

        let qr: Vec<String> = store
            .filter(ScanKind::Qr)
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(qr, vec!["q2", "q1"]);
        assert_eq!(store.filter(ScanKind::EarTag).len(), 1);
        assert_eq!(
            store.counts(),
            ScanCounts {
                all: 3,
                qr: 2,
                ear_tag: 1
            }
        );
    }

    #[test]
    fn persisted_layout_uses_items_and_binding_table() {
        let mut store = ScanStore::new();
        let entry = store.add_item("abc", "qr");
        store.update_item(entry.id, Some(record("n")));

        let value = serde_json::to_value(&store).unwrap();
        assert!(value["items"].is_array());
        assert_eq!(value["bindingTable"]["abc"]["notes"], "n");

        let restored: ScanStore = serde_json::from_value(value).unwrap();
        assert_eq!(restored, store);
    }
}

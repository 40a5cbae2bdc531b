//! Core data models for the scan history service.
//!
//! Entries and metadata records serialize as camelCase JSON via `serde`,
//! which is both the persisted blob format and the HTTP wire format.

pub mod barcode;
pub mod metadata;
pub mod scan_entry;

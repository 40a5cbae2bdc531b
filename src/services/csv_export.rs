//! CSV rendering of the scan history.
//!
//! Output is a pure function of the entry set: QR codes first, then ear tags,
//! each group newest-first, so exporting the same entries twice yields the
//! same bytes no matter how they were ordered in memory.

use crate::models::{barcode, scan_entry::ScanEntry};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io;

/// ISO 3166 numeric prefixes used on animal ear tags, checked in this order.
const COUNTRY_PREFIXES: &[(&str, &str)] = &[
    // European Union
    ("040", "AT"),
    ("056", "BE"),
    ("100", "BG"),
    ("191", "HR"),
    ("196", "CY"),
    ("203", "CZ"),
    ("208", "DK"),
    ("233", "EE"),
    ("246", "FI"),
    ("250", "FR"),
    ("276", "DE"),
    ("300", "GR"),
    ("348", "HU"),
    ("372", "IE"),
    ("380", "IT"),
    ("428", "LV"),
    ("440", "LT"),
    ("442", "LU"),
    ("470", "MT"),
    ("528", "NL"),
    ("616", "PL"),
    ("620", "PT"),
    ("642", "RO"),
    ("703", "SK"),
    ("705", "SI"),
    ("724", "ES"),
    ("752", "SE"),
    // Rest of Europe
    ("756", "CH"),
    ("826", "GB"),
    ("578", "NO"),
    ("352", "IS"),
    ("643", "RU"),
    ("804", "UA"),
    ("807", "MK"),
    ("688", "RS"),
    ("499", "ME"),
    ("070", "BA"),
    ("008", "AL"),
    // Americas
    ("124", "CA"),
    ("840", "US"),
    ("484", "MX"),
    ("076", "BR"),
    ("032", "AR"),
    ("152", "CL"),
    ("170", "CO"),
    ("604", "PE"),
    // Asia & Oceania
    ("036", "AU"),
    ("554", "NZ"),
    ("392", "JP"),
    ("410", "KR"),
    ("156", "CN"),
    ("356", "IN"),
    ("360", "ID"),
    ("458", "MY"),
    ("764", "TH"),
    ("704", "VN"),
    // Africa
    ("710", "ZA"),
    ("404", "KE"),
    ("231", "ET"),
    ("504", "MA"),
    ("818", "EG"),
    ("788", "TN"),
    ("012", "DZ"),
    ("566", "NG"),
];

const BASIC_HEADER: [&str; 3] = ["Inhalt", "Typ", "Datum"];

const ENRICHED_HEADER: [&str; 10] = [
    "Inhalt",
    "Typ",
    "Datum",
    "Tier-ID",
    "Rasse",
    "Geburtsdatum",
    "Gewicht",
    "Besitzer",
    "Standort",
    "Notizen",
];

/// Which columns to emit.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CsvVariant {
    /// Content, type label and date only.
    Basic,
    /// Basic columns plus every metadata field.
    #[default]
    Enriched,
}

/// Replace a leading numeric country prefix with its two-letter code.
///
/// Only the first matching prefix is applied, and only at the start.
pub fn substitute_country_prefix(content: &str) -> String {
    COUNTRY_PREFIXES
        .iter()
        .find_map(|&(prefix, code)| {
            content
                .strip_prefix(prefix)
                .map(|rest| format!("{code}{rest}"))
        })
        .unwrap_or_else(|| content.to_string())
}

/// File name for an export generated at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("ohrmarken_nummern_{}.csv", now.timestamp_millis())
}

/// Order entries for export: QR group first, each group newest-first.
///
/// Ties on the timestamp fall back to the entry id so the order never depends
/// on the input order.
pub fn export_order(entries: &[ScanEntry]) -> Vec<&ScanEntry> {
    let (mut qr, mut ear_tags): (Vec<&ScanEntry>, Vec<&ScanEntry>) =
        entries.iter().partition(|entry| entry.is_qr());
    let newest_first = |a: &&ScanEntry, b: &&ScanEntry| {
        b.captured_at
            .cmp(&a.captured_at)
            .then_with(|| a.id.cmp(&b.id))
    };
    qr.sort_by(newest_first);
    ear_tags.sort_by(newest_first);
    qr.extend(ear_tags);
    qr
}

/// Render `entries` as CSV text with a header row and CRLF line endings.
pub fn generate_csv(entries: &[ScanEntry], variant: CsvVariant) -> csv::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    match variant {
        CsvVariant::Basic => writer.write_record(BASIC_HEADER)?,
        CsvVariant::Enriched => writer.write_record(ENRICHED_HEADER)?,
    }

    for entry in export_order(entries) {
        let content = if barcode::is_ear_tag(&entry.barcode_type) {
            substitute_country_prefix(&entry.original_content)
        } else {
            entry.original_content.clone()
        };
        let label = entry.type_label();

        match variant {
            CsvVariant::Basic => writer.write_record([
                content.as_str(),
                label.as_str(),
                entry.display_date.as_str(),
            ])?,
            CsvVariant::Enriched => {
                let info = entry.metadata.clone().unwrap_or_default();
                writer.write_record([
                    content.as_str(),
                    label.as_str(),
                    entry.display_date.as_str(),
                    info.animal_id.as_deref().unwrap_or(""),
                    info.breed.as_deref().unwrap_or(""),
                    info.birth_date.as_deref().unwrap_or(""),
                    info.weight.as_deref().unwrap_or(""),
                    info.owner_name.as_deref().unwrap_or(""),
                    info.location.as_deref().unwrap_or(""),
                    info.notes.as_deref().unwrap_or(""),
                ])?
            }
        }
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes)
        .map_err(|err| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, err)))
}

//! Barcode type tags as emitted by the scanner front-end.

use serde::Deserialize;

/// Type tag the scanner uses for QR codes. Every other tag is an ear tag.
pub const QR: &str = "qr";

/// Tags the scanner front-end is configured to emit.
pub const KNOWN_TYPES: [&str; 10] = [
    QR,
    "code128",
    "code39",
    "code93",
    "ean13",
    "ean8",
    "upc_e",
    "datamatrix",
    "itf14",
    "pdf417",
];

/// Whether `barcode_type` denotes a QR code.
pub fn is_qr(barcode_type: &str) -> bool {
    barcode_type == QR
}

/// Whether `barcode_type` denotes a livestock ear tag (any non-QR type).
pub fn is_ear_tag(barcode_type: &str) -> bool {
    !is_qr(barcode_type)
}

/// Human-readable label used in listings and CSV exports.
pub fn type_label(barcode_type: &str) -> String {
    if barcode_type == QR {
        return "QR-Code".into();
    }
    if barcode_type.contains("code") {
        return barcode_type.to_uppercase();
    }
    if barcode_type.contains("ean") {
        return format!("EAN-{}", barcode_type.replacen("ean", "", 1));
    }
    match barcode_type {
        "upc_e" => "UPC-E".into(),
        "datamatrix" => "DataMatrix".into(),
        "pdf417" => "PDF417".into(),
        "itf14" => "ITF-14".into(),
        other => other.to_uppercase(),
    }
}

/// History filter: everything, only QR codes, or only ear tags.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    #[default]
    All,
    Qr,
    EarTag,
}

impl ScanKind {
    pub fn matches(self, barcode_type: &str) -> bool {
        match self {
            ScanKind::All => true,
            ScanKind::Qr => is_qr(barcode_type),
            ScanKind::EarTag => is_ear_tag(barcode_type),
        }
    }
}

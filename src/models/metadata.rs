//! User-supplied metadata that can be bound to scanned content.

use serde::{Deserialize, Serialize};

/// Free-form details an operator attaches to a scanned tag.
///
/// Every field is optional. A record without any non-blank field carries no
/// information and is treated exactly like "no metadata": it is never stored
/// on an entry nor kept in the binding table.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Animal identifier, e.g. "DE123456789".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,

    /// Birth date as typed by the operator; not parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    /// Weight in kilograms as typed by the operator; not parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl MetadataRecord {
    /// True when no field holds a non-blank value.
    pub fn is_empty(&self) -> bool {
        self.fields().into_iter().all(|f| f.is_none_or(|v| v.trim().is_empty()))
    }

    /// Trim every field, drop blank ones, and collapse an empty record to `None`.
    pub fn normalized(self) -> Option<Self> {
        let record = Self {
            animal_id: clean(self.animal_id),
            breed: clean(self.breed),
            birth_date: clean(self.birth_date),
            weight: clean(self.weight),
            notes: clean(self.notes),
            owner_name: clean(self.owner_name),
            location: clean(self.location),
        };
        if record.is_empty() { None } else { Some(record) }
    }

    fn fields(&self) -> [Option<&str>; 7] {
        [
            self.animal_id.as_deref(),
            self.breed.as_deref(),
            self.birth_date.as_deref(),
            self.weight.as_deref(),
            self.notes.as_deref(),
            self.owner_name.as_deref(),
            self.location.as_deref(),
        ]
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const RAW_TEXT_FIELD: &str = "raw_extracted_text";
pub const DOCUMENT_TYPE_FIELD: &str = "document_type";
pub const ERROR_FIELD: &str = "error";

/// Free-form field map produced by the structurer.
///
/// There is no fixed schema; the only guaranteed key is `raw_extracted_text`,
/// which [`StructuredRecord::new`] sets and no mutator can remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord(BTreeMap<String, String>);

impl StructuredRecord {
    pub fn new(raw_text: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(RAW_TEXT_FIELD.to_string(), raw_text.into());
        Self(fields)
    }

    /// Inserts a field. Writes to `raw_extracted_text` are ignored; it is
    /// fixed at construction.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key == RAW_TEXT_FIELD {
            return;
        }
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn raw_text(&self) -> &str {
        self.get(RAW_TEXT_FIELD).unwrap_or_default()
    }

    pub fn document_type(&self) -> Option<&str> {
        self.get(DOCUMENT_TYPE_FIELD)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_cannot_be_overwritten_by_insert() {
        let mut record = StructuredRecord::new("original text");
        record.insert(RAW_TEXT_FIELD, "model hallucination");
        record.insert("employer", "Acme GmbH");
        assert_eq!(record.raw_text(), "original text");
        assert_eq!(record.get("employer"), Some("Acme GmbH"));
    }

    #[test]
    fn test_deserialized_record_round_trips_as_flat_object() {
        let record: StructuredRecord = serde_json::from_str(
            r#"{"raw_extracted_text":"abc","document_type":"Payslip"}"#,
        )
        .unwrap();
        assert_eq!(record.document_type(), Some("Payslip"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["raw_extracted_text"], "abc");
    }
}

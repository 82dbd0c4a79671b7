//! Record model
//!
//! A [`Record`] is one input row: a flat map of column name to raw string
//! value, plus the standardized `*_STD` fields derived during a run. The
//! engine never mutates an ingested record in place; standardization clones
//! the record and adds derived fields alongside the raw ones.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard column names consumed by the engine.
///
/// Ingestion is owned by the caller; whatever the upstream source looked
/// like, rows arrive keyed by these names (plus any passthrough columns the
/// engine ignores).
pub mod field {
    pub const COMPANY_NAME: &str = "COMPANY_NAME";
    pub const ADDRESS_LINE_1: &str = "ADDRESS_LINE_1";
    pub const ADDRESS_LINE_2: &str = "ADDRESS_LINE_2";
    pub const CITY: &str = "CITY";
    pub const STATE: &str = "STATE";
    pub const ZIP_CODE: &str = "ZIP_CODE";
    pub const COUNTRY: &str = "COUNTRY";
    pub const PHONE_NUMBER: &str = "PHONE_NUMBER";
    pub const PHONE_EXTENSION: &str = "PHONE_EXTENSION";
    pub const EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
    pub const SOURCE_TYPE: &str = "SOURCE_TYPE";
    pub const SOURCE_ID: &str = "SOURCE_ID";

    // Derived standardized fields, added by `normalize::standardize`.
    pub const COMPANY_NAME_STD: &str = "COMPANY_NAME_STD";
    pub const ADDRESS1_STD: &str = "ADDRESS1_STD";
    pub const ADDRESS2_STD: &str = "ADDRESS2_STD";
    pub const PHONE_STD: &str = "PHONE_STD";
    pub const EMAIL_STD: &str = "EMAIL_STD";
}

/// Index of a record within the current batch.
pub type RecordId = usize;

/// One input row plus derived fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a field; absent fields read as empty.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style setter, mostly useful in tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// True when the field is absent or whitespace-only.
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).trim().is_empty()
    }

    /// `source_type:source_id` identifier used for DedupEntry membership.
    pub fn identifier(&self) -> String {
        format!(
            "{}:{}",
            self.get(field::SOURCE_TYPE).trim(),
            self.get(field::SOURCE_ID).trim()
        )
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_field_reads_empty() {
        let record = Record::new();
        assert_eq!(record.get(field::COMPANY_NAME), "");
        assert!(record.is_blank(field::COMPANY_NAME));
    }

    #[test]
    fn test_blank_is_whitespace_aware() {
        let record = Record::new().with(field::PHONE_NUMBER, "   ");
        assert!(record.is_blank(field::PHONE_NUMBER));
        assert_eq!(record.get(field::PHONE_NUMBER), "   ");
    }

    #[test]
    fn test_identifier() {
        let record = Record::new()
            .with(field::SOURCE_TYPE, "CRM")
            .with(field::SOURCE_ID, " 42 ");
        assert_eq!(record.identifier(), "CRM:42");
    }

    #[test]
    fn test_serde_is_flat_map() {
        let record = Record::new().with(field::COMPANY_NAME, "Acme");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"COMPANY_NAME":"Acme"}"#);
        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}

// crates/types/src/entry.rs
//! Raw backend row entries and their detail-view classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw backend row for a batch file.
///
/// The core only interprets the fields below; feature-specific columns are
/// carried verbatim in `extra` so detail views can render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    pub id: String,
    #[serde(rename = "excelfile")]
    pub excel_file: String,
    /// Backend row state. Open string; anything other than a queued marker
    /// counts as processed.
    pub row_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Feature-specific columns the core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Detail-view classification of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_deserializes_wire_format() {
        let json = r#"{
            "id": "row-1",
            "excelfile": "a.xlsx",
            "rowStatus": "PROCESSED",
            "errorMessage": "duplicate key",
            "createdAt": "2026-02-05T12:00:00Z",
            "updatedAt": "2026-02-05T12:01:00Z",
            "articleNumber": "A-1001"
        }"#;
        let entry: JobEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.excel_file, "a.xlsx");
        assert_eq!(entry.row_status, "PROCESSED");
        assert_eq!(entry.error_message.as_deref(), Some("duplicate key"));
        // Unknown columns land in `extra` untouched
        assert_eq!(
            entry.extra.get("articleNumber").and_then(|v| v.as_str()),
            Some("A-1001")
        );
    }

    #[test]
    fn entry_round_trips() {
        let json = r#"{
            "id": "row-2",
            "excelfile": "b.xlsx",
            "rowStatus": "QUEUED",
            "createdAt": "2026-02-05T12:00:00Z",
            "updatedAt": "2026-02-05T12:00:00Z"
        }"#;
        let entry: JobEntry = serde_json::from_str(json).unwrap();
        let back: JobEntry = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(back, entry);
        assert!(back.error_message.is_none());
    }
}

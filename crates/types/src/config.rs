// crates/types/src/config.rs
//! Static per-feature descriptors supplied at construction.

use serde::{Deserialize, Serialize};

use crate::entry::JobEntry;

/// Immutable descriptor of one feature's REST surface.
///
/// `service` doubles as the job-type key under which the store groups this
/// feature's jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProviderConfig {
    pub service: String,
    /// PUT endpoint that triggers backend processing of an uploaded file.
    pub upload_endpoint: String,
    /// GET endpoint returning per-file row detail.
    pub search_endpoint: String,
    /// GET endpoint returning the cross-file overview.
    pub overview_endpoint: String,
    /// Translation-key prefix for UI labels.
    pub translation_key: String,
    /// Column headers the input sheet must contain.
    pub required_columns: Vec<String>,
    /// Optional task tag appended to overview queries.
    pub overview_task: Option<String>,
}

/// Response of the processing trigger: the server-side file key plus the
/// initial (unprocessed) row entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(rename = "excelfile")]
    pub excel_file: String,
    pub entries: Vec<JobEntry>,
}

// crates/types/src/job.rs
//! Job progress snapshots and the keyed per-job-type state they live in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryStatus, JobEntry};

/// Status of one batch job as mirrored from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further server-side processing is expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Point-in-time summary of one batch job.
///
/// Invariants (enforced by construction in the progress strategy):
/// `successful + failed <= processed <= total`, and `progress` is the
/// integer percentage of `processed` over `total` (0 when `total` is 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Opaque job identifier.
    pub id: String,
    /// Backing file/batch identifier the backend keys this job by.
    pub name: String,
    pub status: JobStatus,
    /// Integer percentage, 0–100.
    pub progress: u8,
    pub total: u64,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    /// Rows still in flight server-side.
    pub running: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-job-type slice of the store: running and completed jobs plus the
/// loading/error flags the UI renders. Created lazily on first write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTypeState {
    pub running: Vec<JobProgress>,
    pub completed: Vec<JobProgress>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Full store state: job-type name (an open string, new types appear at
/// runtime) to that type's state.
pub type JobState = HashMap<String, JobTypeState>;

/// Detail-view assembly for one job: the summary, the raw rows, and a
/// per-row classification aligned with `entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub progress: JobProgress,
    pub entries: Vec<JobEntry>,
    pub entry_statuses: Vec<EntryStatus>,
}

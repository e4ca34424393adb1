// crates/types/src/lib.rs
//! Shared data model for the batch-job tracking core.
//!
//! Everything here is plain data: progress snapshots mirrored from the
//! backend, raw row entries, per-job-type state, and the static descriptor
//! each feature supplies to its data provider.

pub mod config;
pub mod entry;
pub mod job;

pub use config::{JobProviderConfig, TriggerResponse};
pub use entry::{EntryStatus, JobEntry};
pub use job::{JobDetails, JobProgress, JobState, JobStatus, JobTypeState};

// crates/client/src/progress.rs
//! Per-row state machine: derives a `JobProgress` summary from raw entries.
//!
//! Features whose backends use different row-status markers or error fields
//! supply their own `ProgressStrategy`; everyone else uses the default.

use chrono::Utc;

use batchtrack_types::{EntryStatus, JobDetails, JobEntry, JobProgress, JobStatus};

/// Row states that mean the backend has not picked the row up yet.
const QUEUED_ROW_STATES: &[&str] = &["queued", "pending", "new"];

/// Strategy seam for per-feature progress/status derivation.
///
/// The provided methods implement the shared semantics; overriding
/// `is_row_processed` / `is_row_failed` is enough for most features.
pub trait ProgressStrategy: Send + Sync {
    /// Whether the backend has finished this row (terminal per-row state,
    /// successful or not).
    fn is_row_processed(&self, entry: &JobEntry) -> bool {
        !QUEUED_ROW_STATES
            .iter()
            .any(|s| entry.row_status.eq_ignore_ascii_case(s))
    }

    /// Whether a processed row failed.
    fn is_row_failed(&self, entry: &JobEntry) -> bool {
        entry
            .error_message
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty())
    }

    /// Derive the job summary from one file's entries.
    ///
    /// Status is `Running` until every row is processed, then `Failed` if
    /// any row failed, else `Completed`. `end_time` is only populated once
    /// the status is terminal.
    fn calculate_progress(
        &self,
        entries: &[JobEntry],
        job_id: &str,
        excel_file: &str,
    ) -> JobProgress {
        let total = entries.len() as u64;
        let processed = entries.iter().filter(|e| self.is_row_processed(e)).count() as u64;
        let failed = entries
            .iter()
            .filter(|e| self.is_row_processed(e) && self.is_row_failed(e))
            .count() as u64;
        let successful = processed - failed;

        let status = if processed < total {
            JobStatus::Running
        } else if failed > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        let progress = if total > 0 {
            (processed * 100 / total) as u8
        } else {
            0
        };

        let start_time = entries
            .iter()
            .map(|e| e.created_at)
            .min()
            .unwrap_or_else(Utc::now);
        let end_time = if status.is_terminal() {
            entries.iter().map(|e| e.updated_at).max()
        } else {
            None
        };

        JobProgress {
            id: job_id.to_string(),
            name: excel_file.to_string(),
            status,
            progress,
            total,
            processed,
            successful,
            failed,
            running: total - processed,
            start_time,
            end_time,
            message: None,
        }
    }

    /// Classify one row for detail views.
    fn map_entry_status(&self, entry: &JobEntry) -> EntryStatus {
        if !self.is_row_processed(entry) {
            EntryStatus::Pending
        } else if self.is_row_failed(entry) {
            EntryStatus::Failed
        } else {
            EntryStatus::Success
        }
    }

    /// Assemble the detail view for one job from its fetched rows.
    ///
    /// Features whose detail screens need different row selection or extra
    /// derived fields override this; the default pairs the summary with the
    /// rows as fetched and a per-row classification aligned with them.
    fn load_job_details(
        &self,
        entries: Vec<JobEntry>,
        job_id: &str,
        excel_file: &str,
    ) -> JobDetails {
        let progress = self.calculate_progress(&entries, job_id, excel_file);
        let entry_statuses = entries.iter().map(|e| self.map_entry_status(e)).collect();
        JobDetails {
            progress,
            entries,
            entry_statuses,
        }
    }
}

/// The shared default derivation.
pub struct DefaultProgressStrategy;

impl ProgressStrategy for DefaultProgressStrategy {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 12, minute, 0).unwrap()
    }

    fn entry(id: &str, row_status: &str, error: Option<&str>, minute: u32) -> JobEntry {
        JobEntry {
            id: id.to_string(),
            excel_file: "a.xlsx".to_string(),
            row_status: row_status.to_string(),
            error_message: error.map(str::to_string),
            created_at: at(0),
            updated_at: at(minute),
            extra: serde_json::Map::new(),
        }
    }

    fn entries(total: usize, processed: usize, failed: usize) -> Vec<JobEntry> {
        (0..total)
            .map(|i| {
                if i < failed {
                    entry(&format!("r{i}"), "PROCESSED", Some("bad row"), i as u32 + 1)
                } else if i < processed {
                    entry(&format!("r{i}"), "PROCESSED", None, i as u32 + 1)
                } else {
                    entry(&format!("r{i}"), "QUEUED", None, 0)
                }
            })
            .collect()
    }

    #[test]
    fn all_processed_no_failures_is_completed() {
        let progress =
            DefaultProgressStrategy.calculate_progress(&entries(10, 10, 0), "a.xlsx", "a.xlsx");
        assert_eq!(progress.status, JobStatus::Completed);
        assert_eq!(progress.progress, 100);
        assert_eq!(progress.successful, 10);
        assert_eq!(progress.failed, 0);
        assert!(progress.end_time.is_some());
    }

    #[test]
    fn all_processed_with_failures_is_failed() {
        let progress =
            DefaultProgressStrategy.calculate_progress(&entries(10, 10, 3), "a.xlsx", "a.xlsx");
        assert_eq!(progress.status, JobStatus::Failed);
        assert_eq!(progress.failed, 3);
        assert_eq!(progress.successful, 7);
        assert_eq!(progress.progress, 100);
    }

    #[test]
    fn partially_processed_is_running() {
        let progress =
            DefaultProgressStrategy.calculate_progress(&entries(10, 4, 0), "a.xlsx", "a.xlsx");
        assert_eq!(progress.status, JobStatus::Running);
        assert_eq!(progress.progress, 40);
        assert_eq!(progress.running, 6);
        // Not terminal yet, so no end time.
        assert!(progress.end_time.is_none());
    }

    #[test]
    fn two_of_three_truncates_to_66() {
        let progress =
            DefaultProgressStrategy.calculate_progress(&entries(3, 2, 0), "a.xlsx", "a.xlsx");
        assert_eq!(progress.progress, 66);
        assert_eq!(progress.status, JobStatus::Running);
    }

    #[test]
    fn empty_entry_list_has_zero_progress() {
        let progress = DefaultProgressStrategy.calculate_progress(&[], "a.xlsx", "a.xlsx");
        assert_eq!(progress.total, 0);
        assert_eq!(progress.progress, 0);
    }

    #[test]
    fn counts_respect_invariant() {
        let progress =
            DefaultProgressStrategy.calculate_progress(&entries(8, 5, 2), "a.xlsx", "a.xlsx");
        assert!(progress.successful + progress.failed <= progress.processed);
        assert!(progress.processed <= progress.total);
        assert_eq!(progress.processed, 5);
        assert_eq!(progress.failed, 2);
        assert_eq!(progress.successful, 3);
    }

    #[test]
    fn timestamps_come_from_row_extremes() {
        let rows = vec![
            entry("r0", "PROCESSED", None, 9),
            entry("r1", "PROCESSED", None, 3),
        ];
        let progress = DefaultProgressStrategy.calculate_progress(&rows, "a.xlsx", "a.xlsx");
        assert_eq!(progress.start_time, at(0));
        assert_eq!(progress.end_time, Some(at(9)));
    }

    #[test]
    fn entry_status_mapping() {
        let strategy = DefaultProgressStrategy;
        assert_eq!(
            strategy.map_entry_status(&entry("r", "QUEUED", None, 0)),
            EntryStatus::Pending
        );
        assert_eq!(
            strategy.map_entry_status(&entry("r", "PROCESSED", Some("dup"), 1)),
            EntryStatus::Failed
        );
        assert_eq!(
            strategy.map_entry_status(&entry("r", "PROCESSED", None, 1)),
            EntryStatus::Success
        );
        // Whitespace-only error messages don't count as failures.
        assert_eq!(
            strategy.map_entry_status(&entry("r", "PROCESSED", Some("  "), 1)),
            EntryStatus::Success
        );
    }

    /// A feature whose backend flags failures in an extra column instead of
    /// the shared error field.
    struct FlagColumnStrategy;

    impl ProgressStrategy for FlagColumnStrategy {
        fn is_row_failed(&self, entry: &JobEntry) -> bool {
            entry
                .extra
                .get("importResult")
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == "REJECTED")
        }
    }

    #[test]
    fn default_detail_assembly_pairs_rows_with_statuses() {
        let rows = vec![
            entry("r0", "PROCESSED", None, 1),
            entry("r1", "PROCESSED", Some("dup"), 2),
            entry("r2", "QUEUED", None, 0),
        ];
        let details = DefaultProgressStrategy.load_job_details(rows, "a.xlsx", "a.xlsx");
        assert_eq!(details.progress.total, 3);
        assert_eq!(details.entries.len(), 3);
        assert_eq!(
            details.entry_statuses,
            vec![EntryStatus::Success, EntryStatus::Failed, EntryStatus::Pending]
        );
    }

    /// A feature whose detail screen only surfaces the rows that failed.
    struct FailedRowsDetailStrategy;

    impl ProgressStrategy for FailedRowsDetailStrategy {
        fn load_job_details(
            &self,
            entries: Vec<JobEntry>,
            job_id: &str,
            excel_file: &str,
        ) -> JobDetails {
            let progress = self.calculate_progress(&entries, job_id, excel_file);
            let entries: Vec<JobEntry> = entries
                .into_iter()
                .filter(|e| self.is_row_failed(e))
                .collect();
            let entry_statuses = entries.iter().map(|e| self.map_entry_status(e)).collect();
            JobDetails {
                progress,
                entries,
                entry_statuses,
            }
        }
    }

    #[test]
    fn detail_assembly_override_selects_its_own_rows() {
        let rows = vec![
            entry("r0", "PROCESSED", None, 1),
            entry("r1", "PROCESSED", Some("dup"), 2),
        ];
        let details = FailedRowsDetailStrategy.load_job_details(rows, "a.xlsx", "a.xlsx");
        // The summary still covers every row; the view only shows failures.
        assert_eq!(details.progress.total, 2);
        assert_eq!(details.entries.len(), 1);
        assert_eq!(details.entries[0].id, "r1");
        assert_eq!(details.entry_statuses, vec![EntryStatus::Failed]);
    }

    #[test]
    fn strategy_override_changes_failure_mapping() {
        let mut row = entry("r0", "PROCESSED", None, 1);
        row.extra.insert(
            "importResult".to_string(),
            serde_json::Value::String("REJECTED".to_string()),
        );

        let progress = FlagColumnStrategy.calculate_progress(&[row], "a.xlsx", "a.xlsx");
        assert_eq!(progress.status, JobStatus::Failed);
        assert_eq!(progress.failed, 1);
    }
}

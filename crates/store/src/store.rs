// crates/store/src/store.rs
//! Keyed-by-job-type state container.
//!
//! The `JobStore` is the single source of truth for every job type's
//! running/completed lists. All writes go through its narrow method set,
//! each one persisting the whole state before observers are notified, so
//! the in-memory and on-disk views never diverge for more than one
//! synchronous step.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::error;

use batchtrack_types::{JobProgress, JobState, JobTypeState};

use crate::session::SessionStore;

/// Storage key holding the full keyed state.
const JOB_STATE_KEY: &str = "job-state";

/// Change notification emitted after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The named job type's state changed.
    JobTypeChanged(String),
    /// The whole store was reset.
    Cleared,
}

/// Reactive, persisted job-state container.
pub struct JobStore {
    state: RwLock<JobState>,
    session: Arc<SessionStore>,
    events_tx: broadcast::Sender<StoreEvent>,
}

impl JobStore {
    /// Create a store backed by `session`, restoring any persisted state.
    ///
    /// A corrupt persisted blob degrades to an empty state (the bridge
    /// already logged and cleared it).
    pub fn new(session: Arc<SessionStore>) -> Self {
        let state = session.get::<JobState>(JOB_STATE_KEY).unwrap_or_default();
        let (events_tx, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(state),
            session,
            events_tx,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    // -- Write API ------------------------------------------------------------

    /// Replace the running list wholesale; clears `loading` and `error`.
    pub fn set_running_jobs(&self, job_type: &str, jobs: Vec<JobProgress>) {
        self.mutate(job_type, |state| {
            state.running = jobs;
            state.loading = false;
            state.error = None;
        });
    }

    /// Replace the completed list wholesale; clears `loading` and `error`.
    pub fn set_completed_jobs(&self, job_type: &str, jobs: Vec<JobProgress>) {
        self.mutate(job_type, |state| {
            state.completed = jobs;
            state.loading = false;
            state.error = None;
        });
    }

    /// Append one job to the running list.
    pub fn add_running_job(&self, job_type: &str, job: JobProgress) {
        self.mutate(job_type, |state| state.running.push(job));
    }

    /// Replace a job in place, searching running first, then completed.
    /// No-op if the id is unknown.
    pub fn update_job(&self, job_type: &str, job: JobProgress) {
        self.mutate(job_type, |state| {
            if let Some(slot) = state.running.iter_mut().find(|j| j.id == job.id) {
                *slot = job;
            } else if let Some(slot) = state.completed.iter_mut().find(|j| j.id == job.id) {
                *slot = job;
            }
        });
    }

    /// Remove the job from running and prepend it to completed
    /// (most-recent-first). No-op if the id is not in running, which also
    /// makes a second call with the same id a no-op.
    pub fn move_job_to_completed(&self, job_type: &str, job_id: &str) {
        self.mutate(job_type, |state| {
            if let Some(pos) = state.running.iter().position(|j| j.id == job_id) {
                let job = state.running.remove(pos);
                state.completed.insert(0, job);
            }
        });
    }

    /// Remove one job from the running list.
    pub fn remove_running_job(&self, job_type: &str, job_id: &str) {
        self.mutate(job_type, |state| state.running.retain(|j| j.id != job_id));
    }

    /// Reset one job type to its initial state.
    pub fn clear_jobs(&self, job_type: &str) {
        self.mutate(job_type, |state| *state = JobTypeState::default());
    }

    /// Reset every job type, keeping the type keys registered.
    pub fn clear_all_jobs(&self) {
        match self.state.write() {
            Ok(mut state) => {
                for slot in state.values_mut() {
                    *slot = JobTypeState::default();
                }
                self.persist(&state);
            }
            Err(e) => error!("job state lock poisoned during clear_all_jobs: {e}"),
        }
        let _ = self.events_tx.send(StoreEvent::Cleared);
    }

    /// Set the loading flag for one job type.
    pub fn set_loading(&self, job_type: &str, loading: bool) {
        self.mutate(job_type, |state| state.loading = loading);
    }

    /// Set or clear the error for one job type. Setting an error also
    /// clears the loading flag.
    pub fn set_error(&self, job_type: &str, error: Option<String>) {
        self.mutate(job_type, |state| {
            if error.is_some() {
                state.loading = false;
            }
            state.error = error;
        });
    }

    /// Wipe persisted storage and reset the in-memory state to empty.
    pub fn clear_persisted_state(&self) {
        self.session.remove(JOB_STATE_KEY);
        match self.state.write() {
            Ok(mut state) => state.clear(),
            Err(e) => error!("job state lock poisoned during clear_persisted_state: {e}"),
        }
        let _ = self.events_tx.send(StoreEvent::Cleared);
    }

    // -- Read views -----------------------------------------------------------

    /// Snapshot of one job type's state (empty default for unknown types).
    pub fn job_type_state(&self, job_type: &str) -> JobTypeState {
        self.read(|state| state.get(job_type).cloned().unwrap_or_default())
    }

    /// Running jobs for one job type.
    pub fn running_jobs(&self, job_type: &str) -> Vec<JobProgress> {
        self.read(|state| {
            state
                .get(job_type)
                .map(|s| s.running.clone())
                .unwrap_or_default()
        })
    }

    /// Completed jobs for one job type.
    pub fn completed_jobs(&self, job_type: &str) -> Vec<JobProgress> {
        self.read(|state| {
            state
                .get(job_type)
                .map(|s| s.completed.clone())
                .unwrap_or_default()
        })
    }

    /// All running jobs, keyed by job type.
    pub fn all_running_jobs(&self) -> HashMap<String, Vec<JobProgress>> {
        self.read(|state| {
            state
                .iter()
                .map(|(k, v)| (k.clone(), v.running.clone()))
                .collect()
        })
    }

    /// All completed jobs, keyed by job type.
    pub fn all_completed_jobs(&self) -> HashMap<String, Vec<JobProgress>> {
        self.read(|state| {
            state
                .iter()
                .map(|(k, v)| (k.clone(), v.completed.clone()))
                .collect()
        })
    }

    /// Total running-job count across all types.
    pub fn total_running(&self) -> usize {
        self.read(|state| state.values().map(|s| s.running.len()).sum())
    }

    /// Total completed-job count across all types.
    pub fn total_completed(&self) -> usize {
        self.read(|state| state.values().map(|s| s.completed.len()).sum())
    }

    // -- Internals ------------------------------------------------------------

    /// Run one mutation against a job type's state, creating the type first
    /// if this is its first write (idempotent ensure), then persist the
    /// whole state and notify observers.
    fn mutate(&self, job_type: &str, f: impl FnOnce(&mut JobTypeState)) {
        match self.state.write() {
            Ok(mut state) => {
                let slot = state.entry(job_type.to_string()).or_default();
                f(slot);
                self.persist(&state);
            }
            Err(e) => {
                error!(job_type, "job state lock poisoned during mutation: {e}");
                return;
            }
        }
        let _ = self
            .events_tx
            .send(StoreEvent::JobTypeChanged(job_type.to_string()));
    }

    fn read<R>(&self, f: impl FnOnce(&JobState) -> R) -> R {
        match self.state.read() {
            Ok(state) => f(&state),
            Err(e) => {
                error!("job state lock poisoned during read: {e}");
                f(&JobState::default())
            }
        }
    }

    fn persist(&self, state: &JobState) {
        if let Err(e) = self.session.put(JOB_STATE_KEY, state) {
            error!(error = %e, "failed to persist job state");
        }
    }
}

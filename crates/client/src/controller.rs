// crates/client/src/controller.rs
//! Job lifecycle controller: one instance per feature/job type.
//!
//! Owns upload, trigger, polling, progress computation, and the row-entry
//! cache for a single job type, and keeps the `JobStore`'s view of that
//! type current. The active-job map is persisted so a job started before a
//! process restart continues to be tracked afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use batchtrack_store::{JobStore, SessionStore};
use batchtrack_types::{JobDetails, JobEntry, JobProgress, TriggerResponse};

use crate::error::{ControllerError, ProviderError};
use crate::progress::ProgressStrategy;
use crate::provider::{validate_columns, JobDataProvider};

/// Fast cadence: running jobs must feel live.
pub const DEFAULT_RUNNING_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Slow cadence: the completed list changes rarely.
pub const DEFAULT_COMPLETED_POLL_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Lifecycle controller for one job type.
pub struct JobController {
    provider: Arc<dyn JobDataProvider>,
    strategy: Arc<dyn ProgressStrategy>,
    store: Arc<JobStore>,
    session: Arc<SessionStore>,
    /// Job id → backing filename, for jobs whose terminal state is not yet
    /// confirmed. Removal from this map is the exactly-once guard for
    /// moving a job to completed.
    active_jobs: RwLock<HashMap<String, String>>,
    /// Filename → last-fetched rows.
    entries_cache: RwLock<HashMap<String, Vec<JobEntry>>>,
    /// Current cancellation scope; replaced wholesale on navigation.
    cancel: RwLock<CancellationToken>,
    /// Guards duplicate concurrent overview loads.
    overview_load_in_flight: AtomicBool,
    completed_poll: Mutex<Option<JoinHandle<()>>>,
    running_poll: Mutex<Option<JoinHandle<()>>>,
}

impl JobController {
    /// Build a controller, restoring the persisted active-job map.
    pub fn new(
        provider: Arc<dyn JobDataProvider>,
        strategy: Arc<dyn ProgressStrategy>,
        store: Arc<JobStore>,
        session: Arc<SessionStore>,
    ) -> Arc<Self> {
        let key = active_jobs_key(&provider.config().service);
        let active_jobs = session.get::<HashMap<String, String>>(&key).unwrap_or_default();
        if !active_jobs.is_empty() {
            debug!(
                service = %provider.config().service,
                restored = active_jobs.len(),
                "restored active jobs from storage"
            );
        }
        Arc::new(Self {
            provider,
            strategy,
            store,
            session,
            active_jobs: RwLock::new(active_jobs),
            entries_cache: RwLock::new(HashMap::new()),
            cancel: RwLock::new(CancellationToken::new()),
            overview_load_in_flight: AtomicBool::new(false),
            completed_poll: Mutex::new(None),
            running_poll: Mutex::new(None),
        })
    }

    /// The job-type key this controller writes under.
    pub fn job_type(&self) -> &str {
        &self.provider.config().service
    }

    /// Check parsed sheet headers against this feature's required columns.
    pub fn validate_columns(&self, headers: &[String]) -> Result<(), ControllerError> {
        validate_columns(self.provider.config(), headers).map_err(Into::into)
    }

    // -- Upload / trigger -----------------------------------------------------

    /// Upload the raw file. Pure passthrough to the data provider.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ControllerError> {
        self.guarded(self.provider.upload_file(file_name, bytes)).await
    }

    /// Trigger backend processing of an uploaded file.
    pub async fn trigger_processing(
        &self,
        filename: &str,
    ) -> Result<TriggerResponse, ControllerError> {
        self.guarded(self.provider.trigger_processing(filename)).await
    }

    /// Upload, trigger, and register the new job in one step.
    pub async fn process_file_and_create_job(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<JobProgress, ControllerError> {
        let filename = self.upload_file(file_name, bytes).await?;
        self.create_job_from_uploaded_file(&filename).await
    }

    /// Trigger processing of an already-uploaded file, compute the initial
    /// progress, and insert the job into the store's running list.
    pub async fn create_job_from_uploaded_file(
        &self,
        filename: &str,
    ) -> Result<JobProgress, ControllerError> {
        let response = self.trigger_processing(filename).await?;
        let excel_file = response.excel_file.clone();
        let progress = self
            .strategy
            .calculate_progress(&response.entries, &excel_file, &excel_file);

        self.cache_entries(&excel_file, response.entries);
        self.register_active_job(&progress.id, &excel_file);
        self.store.add_running_job(self.job_type(), progress.clone());
        debug!(service = %self.job_type(), file = %excel_file, "job created");
        Ok(progress)
    }

    // -- Fetching -------------------------------------------------------------

    /// Rows for one file, from cache when present and `use_cache` is set.
    pub async fn get_job_entries(
        &self,
        excel_file: &str,
        use_cache: bool,
    ) -> Result<Vec<JobEntry>, ControllerError> {
        if use_cache {
            if let Some(hit) = self.cached_entries(excel_file) {
                return Ok(hit);
            }
        }
        let entries = self.guarded(self.provider.fetch_entries(excel_file)).await?;
        self.cache_entries(excel_file, entries.clone());
        Ok(entries)
    }

    /// Cross-file overview listing used to populate completed history.
    pub async fn get_all_recent_jobs(&self) -> Result<Vec<JobEntry>, ControllerError> {
        self.guarded(self.provider.fetch_overview()).await
    }

    /// Refetch every active job, recompute progress, and update the store.
    ///
    /// Jobs whose rows are all processed are deregistered from the active
    /// map and moved to the completed list; the map removal makes the move
    /// happen exactly once even though later polls may still see the file
    /// in the overview.
    pub async fn get_running_jobs(&self) -> Result<Vec<JobProgress>, ControllerError> {
        let active = self.active_jobs_snapshot();
        let mut still_running = Vec::with_capacity(active.len());

        for (job_id, filename) in active {
            let entries = self.get_job_entries(&filename, false).await?;
            let progress = self.strategy.calculate_progress(&entries, &job_id, &filename);
            self.store.update_job(self.job_type(), progress.clone());

            if progress.processed == progress.total {
                self.deregister_active_job(&job_id);
                self.store.move_job_to_completed(self.job_type(), &job_id);
                debug!(service = %self.job_type(), job = %job_id, status = ?progress.status, "job finished");
            } else {
                still_running.push(progress);
            }
        }
        Ok(still_running)
    }

    /// Fetch the overview, compute one summary per file, and replace the
    /// store's completed list.
    ///
    /// Concurrent callers collapse to one network request: whoever loses
    /// the flag race returns immediately and observes the winner's result
    /// through the store.
    pub async fn load_completed_jobs(&self) -> Result<(), ControllerError> {
        if self
            .overview_load_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(service = %self.job_type(), "overview load already in flight");
            return Ok(());
        }
        self.store.set_loading(self.job_type(), true);

        let result = self.guarded(self.provider.fetch_overview()).await;
        self.overview_load_in_flight.store(false, Ordering::Release);

        match result {
            Ok(entries) => {
                let jobs = self.group_overview(entries);
                self.store.set_completed_jobs(self.job_type(), jobs);
                Ok(())
            }
            Err(e) => {
                // Failed or cancelled, the spinner must not stay up until
                // the next slow-cadence tick.
                self.store.set_loading(self.job_type(), false);
                Err(e)
            }
        }
    }

    /// Full row data for one job, on demand for detail-view navigation.
    /// Reuses rows already cached by the overview when available; assembly
    /// is delegated to the strategy so features can shape their own views.
    pub async fn load_job_details(&self, job_id: &str) -> Result<JobDetails, ControllerError> {
        // Resolve the id back to its API filename key; ids created by this
        // controller are filenames, so fall back to the id itself.
        let filename = self
            .active_jobs_snapshot()
            .into_iter()
            .find(|(id, _)| id == job_id)
            .map(|(_, filename)| filename)
            .unwrap_or_else(|| job_id.to_string());

        let entries = self.get_job_entries(&filename, true).await?;
        Ok(self.strategy.load_job_details(entries, job_id, &filename))
    }

    // -- Polling --------------------------------------------------------------

    /// Start the completed-jobs refresh loop. No-op if already running.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let controller = Arc::clone(self);
        Self::start_loop(&self.completed_poll, interval, move || {
            let controller = Arc::clone(&controller);
            async move {
                if let Err(e) = controller.load_completed_jobs().await {
                    log_poll_error(controller.job_type(), "completed-jobs", &e);
                }
            }
        });
    }

    /// Stop the completed-jobs refresh loop.
    pub fn stop_polling(&self) {
        Self::stop_loop(&self.completed_poll);
    }

    /// Start the running-jobs refresh loop. No-op if already running.
    pub fn start_running_jobs_polling(self: &Arc<Self>, interval: Duration) {
        let controller = Arc::clone(self);
        Self::start_loop(&self.running_poll, interval, move || {
            let controller = Arc::clone(&controller);
            async move {
                if let Err(e) = controller.get_running_jobs().await {
                    log_poll_error(controller.job_type(), "running-jobs", &e);
                }
            }
        });
    }

    /// Stop the running-jobs refresh loop.
    pub fn stop_running_jobs_polling(&self) {
        Self::stop_loop(&self.running_poll);
    }

    fn start_loop<F, Fut>(slot: &Mutex<Option<JoinHandle<()>>>, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut guard = match slot.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("poll handle lock poisoned: {e}");
                return;
            }
        };
        if guard.is_some() {
            return;
        }
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick fires immediately, giving an initial refresh.
                ticker.tick().await;
                tick().await;
            }
        }));
    }

    fn stop_loop(slot: &Mutex<Option<JoinHandle<()>>>) {
        match slot.lock() {
            Ok(mut guard) => {
                if let Some(handle) = guard.take() {
                    handle.abort();
                }
            }
            Err(e) => error!("poll handle lock poisoned: {e}"),
        }
    }

    // -- Cancellation ---------------------------------------------------------

    /// Abort every in-flight request issued by this controller. A response
    /// that arrives after this call is discarded without touching the
    /// store. Cancellation is advisory: the server may still finish the
    /// underlying request.
    pub fn cancel_pending_requests(&self) {
        match self.cancel.write() {
            Ok(mut guard) => {
                guard.cancel();
                *guard = CancellationToken::new();
            }
            Err(e) => error!("cancellation lock poisoned: {e}"),
        }
    }

    fn cancel_token(&self) -> CancellationToken {
        match self.cancel.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                error!("cancellation lock poisoned: {e}");
                CancellationToken::new()
            }
        }
    }

    /// Race a provider call against the current cancellation scope.
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ControllerError> {
        let token = self.cancel_token();
        tokio::select! {
            _ = token.cancelled() => Err(ControllerError::Cancelled),
            res = fut => Ok(res?),
        }
    }

    // -- Caches ---------------------------------------------------------------

    /// Drop every cached row list.
    pub fn clear_entries_cache(&self) {
        match self.entries_cache.write() {
            Ok(mut cache) => cache.clear(),
            Err(e) => error!("entries cache lock poisoned: {e}"),
        }
    }

    /// Drop the cached rows for one file.
    pub fn clear_cache_for_file(&self, excel_file: &str) {
        match self.entries_cache.write() {
            Ok(mut cache) => {
                cache.remove(excel_file);
            }
            Err(e) => error!("entries cache lock poisoned: {e}"),
        }
    }

    fn cached_entries(&self, excel_file: &str) -> Option<Vec<JobEntry>> {
        match self.entries_cache.read() {
            Ok(cache) => cache.get(excel_file).cloned(),
            Err(e) => {
                error!("entries cache lock poisoned: {e}");
                None
            }
        }
    }

    fn cache_entries(&self, excel_file: &str, entries: Vec<JobEntry>) {
        match self.entries_cache.write() {
            Ok(mut cache) => {
                cache.insert(excel_file.to_string(), entries);
            }
            Err(e) => error!("entries cache lock poisoned: {e}"),
        }
    }

    // -- Active-job tracking --------------------------------------------------

    /// Snapshot of the tracked jobs (id → filename).
    pub fn active_jobs_snapshot(&self) -> Vec<(String, String)> {
        match self.active_jobs.read() {
            Ok(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Err(e) => {
                error!("active jobs lock poisoned: {e}");
                Vec::new()
            }
        }
    }

    fn register_active_job(&self, job_id: &str, filename: &str) {
        match self.active_jobs.write() {
            Ok(mut map) => {
                map.insert(job_id.to_string(), filename.to_string());
                self.persist_active_jobs(&map);
            }
            Err(e) => error!("active jobs lock poisoned: {e}"),
        }
    }

    fn deregister_active_job(&self, job_id: &str) {
        match self.active_jobs.write() {
            Ok(mut map) => {
                if map.remove(job_id).is_some() {
                    self.persist_active_jobs(&map);
                }
            }
            Err(e) => error!("active jobs lock poisoned: {e}"),
        }
    }

    fn persist_active_jobs(&self, map: &HashMap<String, String>) {
        let key = active_jobs_key(self.job_type());
        if let Err(e) = self.session.put(&key, map) {
            error!(service = %self.job_type(), error = %e, "failed to persist active jobs");
        }
    }

    // -- Overview grouping ----------------------------------------------------

    /// One `JobProgress` per file, most recent first.
    fn group_overview(&self, entries: Vec<JobEntry>) -> Vec<JobProgress> {
        let mut by_file: HashMap<String, Vec<JobEntry>> = HashMap::new();
        for entry in entries {
            by_file.entry(entry.excel_file.clone()).or_default().push(entry);
        }
        let mut jobs: Vec<JobProgress> = by_file
            .into_iter()
            .map(|(file, rows)| self.strategy.calculate_progress(&rows, &file, &file))
            .collect();
        jobs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        jobs
    }
}

fn active_jobs_key(service: &str) -> String {
    format!("active-jobs-{service}")
}

fn log_poll_error(service: &str, cadence: &str, error: &ControllerError) {
    // Poll failures must never interrupt the user's workflow: log and keep
    // the previous known state.
    if error.is_cancelled() {
        debug!(service, cadence, "poll tick cancelled");
    } else {
        warn!(service, cadence, error = %error, "poll tick failed");
    }
}

// crates/poller/src/orchestrator.rs
//! Cross-feature polling lifecycle.
//!
//! Screens never manage their own timers: the orchestrator starts every
//! authorized service's two polling loops, pauses and resumes them
//! globally (e.g. around logout), and cancels all in-flight requests on
//! every route navigation so abandoned background calls cannot delay the
//! next page's load.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use batchtrack_client::{
    JobController, DEFAULT_COMPLETED_POLL_INTERVAL, DEFAULT_RUNNING_POLL_INTERVAL,
};

use crate::registry::{JobServiceRegistration, ServiceRegistry};

/// A completed route change. Emitted by the application's router layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub route: String,
}

/// Owns the polling lifecycle for every registered job service.
pub struct PollingOrchestrator {
    registry: ServiceRegistry,
    completed_interval: Duration,
    running_interval: Duration,
    nav_task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingOrchestrator {
    /// Orchestrator with the library-wide default cadences.
    pub fn new() -> Self {
        Self::with_intervals(DEFAULT_COMPLETED_POLL_INTERVAL, DEFAULT_RUNNING_POLL_INTERVAL)
    }

    /// Orchestrator with explicit cadences (slow completed refresh, fast
    /// running refresh).
    pub fn with_intervals(completed_interval: Duration, running_interval: Duration) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            completed_interval,
            running_interval,
            nav_task: Mutex::new(None),
        }
    }

    /// Record a job service. The controller is not built until the service
    /// is first used by an authorized caller.
    pub fn register_job_service(&self, registration: JobServiceRegistration) {
        self.registry.register(registration);
    }

    /// The (lazily built) controller for `name`, for UI layers that need
    /// direct calls like `load_job_details`.
    pub fn controller(&self, name: &str) -> Option<Arc<JobController>> {
        self.registry.controller_for(name)
    }

    /// Start polling for every service the authorizer approves.
    ///
    /// The authorizer receives the service name and its required roles and
    /// answers whether the current caller may use it; the orchestrator
    /// itself never interprets roles. Resolves once every approved
    /// service's loops are running.
    pub async fn initialize_polling<F>(&self, authorizer: F)
    where
        F: Fn(&str, &[String]) -> bool,
    {
        for (name, roles) in self.registry.registrations() {
            if !authorizer(&name, &roles) {
                debug!(service = %name, "service not authorized, skipping");
                continue;
            }
            match self.registry.controller_for(&name) {
                Some(controller) => {
                    controller.start_polling(self.completed_interval);
                    controller.start_running_jobs_polling(self.running_interval);
                    debug!(service = %name, "polling started");
                }
                None => warn!(service = %name, "registration disappeared before start"),
            }
        }
        info!(
            services = self.registry.instantiated().len(),
            "polling initialized"
        );
    }

    /// Subscribe to route changes. On every navigation, every instantiated
    /// controller's pending requests are cancelled — a fire-and-forget side
    /// effect, never a blocking step in navigation itself.
    pub fn watch_navigation(self: &Arc<Self>, mut events: broadcast::Receiver<NavigationEvent>) {
        // Weak so a forgotten orchestrator can still be dropped; the task
        // exits on the first event after that.
        let orchestrator = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(orchestrator) = orchestrator.upgrade() else {
                            break;
                        };
                        debug!(route = %event.route, "navigation: cancelling pending requests");
                        for controller in orchestrator.registry.instantiated() {
                            controller.cancel_pending_requests();
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "navigation events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        match self.nav_task.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.replace(handle) {
                    previous.abort();
                }
            }
            Err(e) => error!("navigation task lock poisoned: {e}"),
        }
    }

    /// Pause every instantiated service's polling (e.g. around logout).
    pub fn stop_all_polling(&self) {
        for controller in self.registry.instantiated() {
            controller.stop_polling();
            controller.stop_running_jobs_polling();
        }
        info!("all polling stopped");
    }

    /// Restart polling for every instantiated service. An explicit interval
    /// overrides the completed-refresh cadence; the running cadence always
    /// uses the configured fast default.
    pub fn resume_polling(&self, completed_interval: Option<Duration>) {
        let completed = completed_interval.unwrap_or(self.completed_interval);
        for controller in self.registry.instantiated() {
            controller.start_polling(completed);
            controller.start_running_jobs_polling(self.running_interval);
        }
        info!("polling resumed");
    }

    /// Unsubscribe the navigation listener and stop all service polling.
    pub fn shutdown(&self) {
        match self.nav_task.lock() {
            Ok(mut slot) => {
                if let Some(handle) = slot.take() {
                    handle.abort();
                }
            }
            Err(e) => error!("navigation task lock poisoned: {e}"),
        }
        self.stop_all_polling();
    }
}

impl Default for PollingOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollingOrchestrator {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.nav_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

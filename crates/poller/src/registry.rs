// crates/poller/src/registry.rs
//! Named job-service registrations and lazy controller instantiation.
//!
//! Controllers are NOT built at registration time: whether a service may
//! run at all depends on role checks that happen later, so the registry
//! only holds a factory closure until the first authorized use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use batchtrack_client::JobController;

/// Builds a service's controller on first use.
pub type ControllerFactory = Arc<dyn Fn() -> Arc<JobController> + Send + Sync>;

/// One registered job service.
#[derive(Clone)]
pub struct JobServiceRegistration {
    /// Unique service name; matches the controller's job-type key.
    pub name: String,
    /// Human-readable name for dashboards.
    pub display_name: String,
    /// Roles the caller must hold for this service to be polled. The
    /// registry never interprets these; the orchestrator's authorizer does.
    pub required_roles: Vec<String>,
    pub factory: ControllerFactory,
}

impl std::fmt::Debug for JobServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobServiceRegistration")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("required_roles", &self.required_roles)
            .finish()
    }
}

/// Registry of job services and their lazily-built controllers.
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, JobServiceRegistration>>,
    controllers: RwLock<HashMap<String, Arc<JobController>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            controllers: RwLock::new(HashMap::new()),
        }
    }

    /// Record a service. Re-registering a name replaces the previous entry
    /// (and logs, since that usually signals duplicated wiring).
    pub fn register(&self, registration: JobServiceRegistration) {
        match self.services.write() {
            Ok(mut services) => {
                if services
                    .insert(registration.name.clone(), registration.clone())
                    .is_some()
                {
                    warn!(service = %registration.name, "service re-registered, replacing");
                } else {
                    debug!(service = %registration.name, "service registered");
                }
            }
            Err(e) => error!("service registry lock poisoned: {e}"),
        }
    }

    /// The controller for `name`, building it on first call.
    /// Returns `None` for unregistered names.
    pub fn controller_for(&self, name: &str) -> Option<Arc<JobController>> {
        if let Ok(controllers) = self.controllers.read() {
            if let Some(existing) = controllers.get(name) {
                return Some(Arc::clone(existing));
            }
        }
        let factory = match self.services.read() {
            Ok(services) => Arc::clone(&services.get(name)?.factory),
            Err(e) => {
                error!("service registry lock poisoned: {e}");
                return None;
            }
        };
        match self.controllers.write() {
            Ok(mut controllers) => {
                // A racing caller may have built it in the meantime.
                let controller = controllers
                    .entry(name.to_string())
                    .or_insert_with(|| factory())
                    .clone();
                Some(controller)
            }
            Err(e) => {
                error!("controller map lock poisoned: {e}");
                None
            }
        }
    }

    /// Snapshot of all registrations (name, required roles).
    pub fn registrations(&self) -> Vec<(String, Vec<String>)> {
        match self.services.read() {
            Ok(services) => services
                .values()
                .map(|r| (r.name.clone(), r.required_roles.clone()))
                .collect(),
            Err(e) => {
                error!("service registry lock poisoned: {e}");
                Vec::new()
            }
        }
    }

    /// Every controller instantiated so far.
    pub fn instantiated(&self) -> Vec<Arc<JobController>> {
        match self.controllers.read() {
            Ok(controllers) => controllers.values().cloned().collect(),
            Err(e) => {
                error!("controller map lock poisoned: {e}");
                Vec::new()
            }
        }
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no services are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("service_count", &self.len())
            .field(
                "instantiated_count",
                &self.controllers.read().map(|c| c.len()).unwrap_or(0),
            )
            .finish()
    }
}

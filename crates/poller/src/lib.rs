// crates/poller/src/lib.rs
//! Cross-feature polling orchestration.
//!
//! Provides:
//! - `ServiceRegistry` — named job-service registrations with lazy
//!   controller instantiation
//! - `PollingOrchestrator` — starts/stops/resumes every authorized
//!   service's polling loops and cancels in-flight requests on navigation

pub mod orchestrator;
pub mod registry;

pub use orchestrator::{NavigationEvent, PollingOrchestrator};
pub use registry::{ControllerFactory, JobServiceRegistration, ServiceRegistry};

// crates/client/src/lib.rs
//! Job lifecycle layer: data providers, progress derivation, and the
//! per-feature controller.
//!
//! Provides:
//! - `JobDataProvider` — per-feature REST adapter seam
//! - `RestJobDataProvider` — generic implementation over `JobProviderConfig`
//! - `ProgressStrategy` / `DefaultProgressStrategy` — per-row state machine
//! - `JobController` — upload → trigger → poll → cache → terminal detection

pub mod controller;
pub mod error;
pub mod progress;
pub mod provider;
pub mod rest;

pub use controller::{
    JobController, DEFAULT_COMPLETED_POLL_INTERVAL, DEFAULT_RUNNING_POLL_INTERVAL,
};
pub use error::{ControllerError, ProviderError};
pub use progress::{DefaultProgressStrategy, ProgressStrategy};
pub use provider::{validate_columns, JobDataProvider};
pub use rest::{RestJobDataProvider, BACKGROUND_REQUEST_HEADER};

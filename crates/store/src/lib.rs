// crates/store/src/lib.rs
//! Persisted state for the batch-job tracking core.
//!
//! Provides:
//! - `SessionStore` — directory-backed JSON key-value bridge
//! - `JobStore` — keyed-by-job-type state container, persisted on every write
//! - `StoreEvent` — change notifications for UI observers

pub mod error;
pub mod session;
pub mod store;

pub use error::StoreError;
pub use session::SessionStore;
pub use store::{JobStore, StoreEvent};

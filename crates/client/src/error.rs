// crates/client/src/error.rs
use thiserror::Error;

/// Errors from a data provider's REST calls
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Errors surfaced by the job lifecycle controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The request was abandoned by `cancel_pending_requests` before it
    /// resolved. Never surfaced to the user; the abandoned response never
    /// reaches the store.
    #[error("request cancelled")]
    Cancelled,
}

impl ControllerError {
    /// Whether this error came from navigation-driven cancellation rather
    /// than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ControllerError::Cancelled)
    }
}

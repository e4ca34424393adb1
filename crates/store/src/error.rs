// crates/store/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the persisted key-value bridge
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage directory cannot be created: {path}")]
    DirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied writing storage key at {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_classification() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            StoreError::io("/tmp/state", denied),
            StoreError::PermissionDenied { .. }
        ));

        let other = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
        assert!(matches!(
            StoreError::io("/tmp/state", other),
            StoreError::Io { .. }
        ));
    }

    #[test]
    fn display_includes_path() {
        let err = StoreError::io(
            "/tmp/state/job-state.json",
            std::io::Error::new(std::io::ErrorKind::Other, "disk error"),
        );
        assert!(err.to_string().contains("/tmp/state/job-state.json"));
    }
}

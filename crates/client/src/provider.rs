// crates/client/src/provider.rs
//! JobDataProvider trait defining the per-feature REST adapter seam.

use async_trait::async_trait;

use batchtrack_types::{JobEntry, JobProviderConfig, TriggerResponse};

use crate::error::ProviderError;

/// Trait for the four REST operations one batch-job feature consumes.
///
/// Implementations include:
/// - `RestJobDataProvider` — generic reqwest client over `JobProviderConfig`
/// - test stubs that script responses without a network
#[async_trait]
pub trait JobDataProvider: Send + Sync {
    /// The feature's static descriptor. `config().service` is the job-type
    /// key used throughout the store.
    fn config(&self) -> &JobProviderConfig;

    /// Upload the raw file bytes. Returns the server-side filename key
    /// every later call is parameterized by.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ProviderError>;

    /// Kick off asynchronous backend processing of an uploaded file.
    /// Returns the file key plus the initial (unprocessed) row entries.
    async fn trigger_processing(&self, filename: &str) -> Result<TriggerResponse, ProviderError>;

    /// Per-file row detail.
    async fn fetch_entries(&self, filename: &str) -> Result<Vec<JobEntry>, ProviderError>;

    /// Cross-file overview used to populate job history.
    async fn fetch_overview(&self) -> Result<Vec<JobEntry>, ProviderError>;
}

/// Check parsed sheet headers against the feature's required columns.
///
/// Matching is case-insensitive; missing columns are reported together so
/// the user fixes the sheet in one pass.
pub fn validate_columns(
    config: &JobProviderConfig,
    headers: &[String],
) -> Result<(), ProviderError> {
    let missing: Vec<String> = config
        .required_columns
        .iter()
        .filter(|required| {
            !headers
                .iter()
                .any(|h| h.eq_ignore_ascii_case(required.as_str()))
        })
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JobProviderConfig {
        JobProviderConfig {
            service: "pricing-import".to_string(),
            upload_endpoint: "uploadpricing".to_string(),
            search_endpoint: "searchpricingentries".to_string(),
            overview_endpoint: "searchpricingfiles".to_string(),
            translation_key: "pricing.import".to_string(),
            required_columns: vec!["Article".to_string(), "Price".to_string()],
            overview_task: None,
        }
    }

    #[test]
    fn validate_accepts_case_insensitive_headers() {
        let headers = vec!["article".to_string(), "PRICE".to_string(), "Note".to_string()];
        assert!(validate_columns(&config(), &headers).is_ok());
    }

    #[test]
    fn validate_reports_all_missing_columns() {
        let headers = vec!["Note".to_string()];
        match validate_columns(&config(), &headers) {
            Err(ProviderError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Article".to_string(), "Price".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}

// crates/client/src/rest.rs
//! Generic reqwest implementation of `JobDataProvider`.
//!
//! Every feature instantiates this with its own `JobProviderConfig`; the
//! endpoint paths and query parameters are the only per-feature variation
//! on the wire.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use batchtrack_types::{JobEntry, JobProviderConfig, TriggerResponse};

use crate::error::ProviderError;
use crate::provider::JobDataProvider;

/// Header marking a request as background polling so the API gateway
/// suppresses user-facing error notifications for it.
pub const BACKGROUND_REQUEST_HEADER: &str = "x-background-request";

/// REST data provider parameterized by a per-feature config.
pub struct RestJobDataProvider {
    base_url: String,
    config: JobProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: String,
}

impl RestJobDataProvider {
    /// Build a provider over a shared HTTP client.
    pub fn new(base_url: impl Into<String>, config: JobProviderConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
            client,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.json().await.map_err(|source| ProviderError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl JobDataProvider for RestJobDataProvider {
    fn config(&self) -> &JobProviderConfig {
        &self.config
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ProviderError> {
        let url = self.url("uploadfile");
        let form = Form::new().part(
            "file",
            Part::bytes(bytes).file_name(file_name.to_string()),
        );
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.clone(),
                source,
            })?;
        let body: UploadResponse = Self::decode(&url, response).await?;
        debug!(service = %self.config.service, filename = %body.filename, "file uploaded");
        Ok(body.filename)
    }

    async fn trigger_processing(&self, filename: &str) -> Result<TriggerResponse, ProviderError> {
        let url = self.url(&self.config.upload_endpoint);
        let response = self
            .client
            .put(&url)
            .query(&[("filename", filename)])
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.clone(),
                source,
            })?;
        Self::decode(&url, response).await
    }

    async fn fetch_entries(&self, filename: &str) -> Result<Vec<JobEntry>, ProviderError> {
        let url = self.url(&self.config.search_endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("filename", filename)])
            .header(BACKGROUND_REQUEST_HEADER, "1")
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.clone(),
                source,
            })?;
        Self::decode(&url, response).await
    }

    async fn fetch_overview(&self) -> Result<Vec<JobEntry>, ProviderError> {
        let url = self.url(&self.config.overview_endpoint);
        let mut request = self
            .client
            .get(&url)
            .header(BACKGROUND_REQUEST_HEADER, "1");
        if let Some(task) = &self.config.overview_task {
            request = request.query(&[("task", task)]);
        }
        let response = request.send().await.map_err(|source| ProviderError::Request {
            url: url.clone(),
            source,
        })?;
        Self::decode(&url, response).await
    }
}

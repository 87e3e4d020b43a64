pub mod config;
pub mod schemas;

use std::sync::Arc;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use vt_core::{GenerationPayload, JobHandle, JobStatus, ProductInput, ShopTheme};
use crate::generator::backend::config::BackendConfig;
use crate::generator::backend::schemas::{JobCreateRequest, JobCreateResponse, JobStatusResponse};

#[derive(Error, Debug)]
pub enum JobClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed backend response: {0}")]
    Protocol(String),
}

impl JobClientError {
    /// Network-level failures, as opposed to a response we could not understand
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Protocol(_))
    }
}

/// Request layer for the generation backend.
///
/// Implementations never retry; that policy belongs to the poll loop.
#[async_trait]
pub trait JobClient: Send + Sync {
    async fn submit(&self, product: &ProductInput) -> Result<JobHandle, JobClientError>;

    /// A non-2xx answer is the backend reporting failure and comes back as
    /// `JobStatus::Failed`; only transport problems are errors.
    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, JobClientError>;

    /// Best-effort revoke of a job nobody is waiting for anymore
    async fn cancel(&self, _handle: &JobHandle) -> Result<(), JobClientError> {
        Ok(())
    }
}

#[async_trait]
impl<T: JobClient + ?Sized> JobClient for Arc<T> {
    async fn submit(&self, product: &ProductInput) -> Result<JobHandle, JobClientError> {
        (**self).submit(product).await
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, JobClientError> {
        (**self).fetch_status(handle).await
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), JobClientError> {
        (**self).cancel(handle).await
    }
}

pub struct HttpJobClient {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpJobClient {
    pub fn new(config: BackendConfig) -> Result<Self, JobClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!("Generation backend at {}", config.base_url);

        Ok(Self { client, config })
    }

    pub fn with_theme(mut self, theme: ShopTheme) -> Self {
        self.config.theme = Some(theme);
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub async fn health(&self) -> Result<(), JobClientError> {
        let response = self.client
            .get(self.config.endpoint("/api/health"))
            .send()
            .await
            .map_err(transport)?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, JobClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(JobClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, JobClientError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| JobClientError::Protocol(format!("{e} in body {}", truncate(&text, 200))))
    }
}

#[async_trait]
impl JobClient for HttpJobClient {
    async fn submit(&self, product: &ProductInput) -> Result<JobHandle, JobClientError> {
        let request_body = JobCreateRequest {
            product_data: product.into(),
            shop_theme: self.config.theme.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self.client
            .post(self.config.endpoint("/api/generate-product-3d"))
            .json(&request_body)
            .send()
            .await
            .map_err(transport)?;

        let response = Self::ensure_success(response).await?;
        let created: JobCreateResponse = Self::parse_json(response).await?;

        match created.job_id {
            Some(id) if !id.trim().is_empty() => {
                debug!(product_id = %product.id, job_id = %id, "Job submitted");
                Ok(JobHandle::new(id))
            }
            _ => Err(JobClientError::Protocol(format!(
                "submission for product {} returned no job id",
                product.id
            ))),
        }
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, JobClientError> {
        let response = self.client
            .get(self.config.endpoint(&format!("/api/task-result/{}", handle.job_id)))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(JobStatus::Failed {
                reason: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let resp: JobStatusResponse = Self::parse_json(response).await?;
        match resp.status.as_str() {
            "pending" => Ok(JobStatus::Pending),
            "success" => {
                let source = resp.source().ok_or_else(|| {
                    JobClientError::Protocol(format!("job {} reported success without a payload", handle))
                })?;
                Ok(JobStatus::Succeeded {
                    payload: GenerationPayload {
                        source: source.to_string(),
                        metadata: resp.metadata(),
                    },
                })
            }
            _ => Ok(JobStatus::Failed {
                reason: resp.failure_reason(),
            }),
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), JobClientError> {
        let response = self.client
            .delete(self.config.endpoint(&format!("/api/task/{}", handle.job_id)))
            .send()
            .await
            .map_err(transport)?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Refused or unreachable hosts get their own variant so logs tell them apart
fn transport(e: reqwest::Error) -> JobClientError {
    if e.is_connect() {
        JobClientError::Connection(e.to_string())
    } else {
        JobClientError::Request(e)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

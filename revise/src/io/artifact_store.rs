//! Artifact storage for generated versions (`POST /api/apps/{session}/{version}`).
//!
//! Uploads are best-effort: the controller never rolls back history when one
//! fails, it only reports the failure.
//!
//! # Retry Strategy
//!
//! - HTTP 429 and 5xx → retry
//! - Other 4xx → fail immediately
//! - Network errors → retry
//! - Backoff doubles from the base delay (500ms default), capped at 2^5 steps

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::io::api_url;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("storage request failed: {0}")]
    Transport(String),
    #[error("invalid artifact address: {0}")]
    Address(String),
}

impl StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            StoreError::Transport(_) => true,
            StoreError::Address(_) => false,
        }
    }
}

/// Abstraction over artifact persistence backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `html` as version `version_label` of `session_id`.
    async fn save(&self, session_id: &str, version_label: &str, html: &str)
    -> Result<(), StoreError>;
}

/// Store that uploads raw HTML to `{base_url}/api/apps/{session}/{version}`.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff: Duration,
}

impl HttpArtifactStore {
    pub fn new(base_url: &Url, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build storage http client")?;
        Ok(Self {
            client,
            base_url: base_url.clone(),
            max_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Override the base retry delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn artifact_url(&self, session_id: &str, version_label: &str) -> Result<Url, StoreError> {
        api_url(&self.base_url, &["api", "apps", session_id, version_label])
            .map_err(|err| StoreError::Address(err.to_string()))
    }

    async fn post_once(&self, url: &Url, html: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(html.to_string())
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    #[instrument(skip(self, html), fields(html_bytes = html.len()))]
    async fn save(
        &self,
        session_id: &str,
        version_label: &str,
        html: &str,
    ) -> Result<(), StoreError> {
        let url = self.artifact_url(session_id, version_label)?;
        let mut attempt = 0u32;
        loop {
            match self.post_once(&url, html).await {
                Ok(()) => {
                    debug!(attempt, "artifact stored");
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff * (1u32 << attempt.min(5));
                    warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "artifact upload failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

//! Generation service abstraction.
//!
//! The [`Generator`] trait decouples the controller from the HTTP endpoint
//! (`POST /api/generate`). Tests use scripted generators that return
//! predetermined responses without a network.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::Usage;
use crate::io::api_url;

/// Request body for `/api/generate`. Unset fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GenerateRequest {
    /// Initial generation from a query, with whatever HTML is on display.
    pub fn initial(query: &str, current_html: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            current_html: Some(current_html.to_string()),
            feedback: None,
        }
    }

    /// Revision of `current_html` driven by feedback.
    pub fn revision(current_html: &str, feedback: &str) -> Self {
        Self {
            query: None,
            current_html: Some(current_html.to_string()),
            feedback: Some(feedback.to_string()),
        }
    }
}

/// Success body from `/api/generate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GenerateResponse {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Structured client-error body: `{ error, category }`.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// HTTP 400 carrying a category; shown to the user verbatim.
    #[error("{error} (category: {category})")]
    Rejected { error: String, category: String },
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation request failed: {0}")]
    Transport(String),
    #[error("decode generation response: {0}")]
    Decode(String),
}

/// Abstraction over generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError>;
}

/// Generator that posts JSON to `{base_url}/api/generate`.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: Client,
    endpoint: Url,
}

impl HttpGenerator {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build generation http client")?;
        Ok(Self {
            client,
            endpoint: api_url(base_url, &["api", "generate"])?,
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, revision = request.feedback.is_some()))]
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| GenerateError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GenerateError::Transport(err.to_string()))?;

        if status.is_success() {
            let parsed: GenerateResponse =
                serde_json::from_str(&body).map_err(|err| GenerateError::Decode(err.to_string()))?;
            debug!(
                html_bytes = parsed.html.as_deref().map_or(0, str::len),
                "generation succeeded"
            );
            return Ok(parsed);
        }

        Err(classify_failure(status, body))
    }
}

/// Map a non-success response onto [`GenerateError`].
///
/// Only a 400 whose JSON body names a `category` counts as a rejection; every
/// other failure is opaque.
fn classify_failure(status: StatusCode, body: String) -> GenerateError {
    if status == StatusCode::BAD_REQUEST {
        if let Some((error, category)) = serde_json::from_str::<RejectionBody>(&body)
            .ok()
            .and_then(|parsed| Some((parsed.error, parsed.category.filter(|c| !c.is_empty())?)))
        {
            warn!(%category, "generation rejected");
            return GenerateError::Rejected {
                error: error.unwrap_or_default(),
                category,
            };
        }
    }
    warn!(status = status.as_u16(), "generation failed");
    GenerateError::Status {
        status: status.as_u16(),
        body,
    }
}

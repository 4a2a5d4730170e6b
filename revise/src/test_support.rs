//! Test-only collaborators with scripted behavior.
//!
//! [`ScriptedGenerator`] replays queued responses and records every request;
//! [`RecordingStore`] captures uploads and can be told to fail.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::types::{Usage, Version};
use crate::io::artifact_store::{ArtifactStore, StoreError};
use crate::io::generator::{GenerateError, GenerateRequest, GenerateResponse, Generator};

pub type ScriptedResponse = Result<GenerateResponse, GenerateError>;

/// Successful response carrying `html` and no usage.
pub fn html_response(html: &str) -> ScriptedResponse {
    Ok(GenerateResponse::html(html))
}

/// Successful response carrying `html` and usage metrics.
pub fn html_response_with_usage(html: &str, total_time: f64, total_tokens: u64) -> ScriptedResponse {
    Ok(GenerateResponse::html(html).with_usage(Usage {
        total_time,
        total_tokens,
    }))
}

/// Structured 400 rejection.
pub fn rejection(error: &str, category: &str) -> ScriptedResponse {
    Err(GenerateError::Rejected {
        error: error.to_string(),
        category: category.to_string(),
    })
}

/// Opaque server failure.
pub fn server_error(status: u16) -> ScriptedResponse {
    Err(GenerateError::Status {
        status,
        body: "scripted failure".to_string(),
    })
}

/// Generator that pops one queued response per request.
///
/// When the queue is empty it answers with a 500. With a gate installed, each
/// request waits for [`ScriptedGenerator::release`] before answering.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<GenerateRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every request until released.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one gated request complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| server_error(500))
    }
}

/// One captured upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub session_id: String,
    pub version_label: String,
    pub html: String,
}

impl SavedArtifact {
    pub fn of(version: &Version) -> Self {
        Self {
            session_id: version.session_id.clone(),
            version_label: version.version_label.clone(),
            html: version.html.clone(),
        }
    }
}

/// Store that records uploads, optionally failing every one of them.
#[derive(Default)]
pub struct RecordingStore {
    saves: Mutex<Vec<SavedArtifact>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose uploads always fail (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            saves: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saves(&self) -> Vec<SavedArtifact> {
        self.saves.lock().expect("saves lock").clone()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn save(
        &self,
        session_id: &str,
        version_label: &str,
        html: &str,
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Status {
                status: 503,
                body: "scripted outage".to_string(),
            });
        }
        self.saves.lock().expect("saves lock").push(SavedArtifact {
            session_id: session_id.to_string(),
            version_label: version_label.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

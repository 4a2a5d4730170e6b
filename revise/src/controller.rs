//! Iteration controller: query/feedback modes, generation requests, and
//! branch-on-edit history updates.
//!
//! A [`Controller`] owns one session. Cloning it yields another handle to the
//! same session, so a front end can keep navigating while a request runs in
//! a spawned task. At most one generation request may be unsettled at a time;
//! overlapping submissions fail fast with [`ControllerError::Busy`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::history::{HistoryError, HistoryStore};
use crate::core::label::LabelPolicy;
use crate::core::prompt::{PromptInputs, construct_prompt};
use crate::core::types::{ArtifactRef, Direction, Mode, Version, VersionPatch};
use crate::io::artifact_store::{ArtifactStore, HttpArtifactStore};
use crate::io::config::ReviseConfig;
use crate::io::generator::{GenerateError, GenerateRequest, GenerateResponse, Generator, HttpGenerator};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The service refused the input (HTTP 400 with a category).
    #[error("{error} (category: {category})")]
    Rejected { error: String, category: String },
    #[error(transparent)]
    Generation(GenerateError),
    #[error("a generation request is already in flight")]
    Busy,
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl From<GenerateError> for ControllerError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Rejected { error, category } => {
                ControllerError::Rejected { error, category }
            }
            other => ControllerError::Generation(other),
        }
    }
}

/// Result of a submission that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new version was appended and is now displayed.
    Appended(Appended),
    /// Feedback was blank after trimming; nothing was sent.
    Ignored,
    /// The service answered without HTML; nothing changed.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub version: Version,
    /// History index of the new version (also the new cursor).
    pub index: usize,
    pub persisted: Persisted,
}

/// Whether the artifact upload for a new version succeeded.
///
/// A failed upload never removes the version from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
    Saved,
    Failed(String),
}

/// Mutable session state. [`Controller::snapshot`] hands out copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub history: HistoryStore,
    pub mode: Mode,
    /// Last query submitted (or typed) in query mode.
    pub query: String,
    /// Pending feedback text, restored from the target version on navigation.
    pub feedback_input: String,
    pub displayed_html: String,
    pub in_flight: bool,
}

/// Construction options for a [`Controller`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Fixed session id; a UUID v4 is generated when `None`.
    pub session_id: Option<String>,
    pub labels: LabelPolicy,
}

impl From<&ReviseConfig> for SessionOptions {
    fn from(cfg: &ReviseConfig) -> Self {
        Self {
            session_id: cfg.session_id.clone(),
            labels: cfg.labels,
        }
    }
}

struct Shared<G, S> {
    generator: G,
    store: S,
    session_id: String,
    labels: LabelPolicy,
    state: Mutex<SessionState>,
}

pub struct Controller<G, S> {
    shared: Arc<Shared<G, S>>,
}

impl<G, S> Clone for Controller<G, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Clears `in_flight` when the request settles, including on cancellation.
struct FlightGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).in_flight = false;
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn non_empty_html(response: &GenerateResponse) -> Option<String> {
    response.html.clone().filter(|html| !html.is_empty())
}

impl Controller<HttpGenerator, HttpArtifactStore> {
    /// Controller talking to the HTTP collaborators at `cfg.base_url`.
    pub fn from_config(cfg: &ReviseConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let base_url = cfg.base_url()?;
        let generator = HttpGenerator::new(&base_url, cfg.generation.timeout())?;
        let store = HttpArtifactStore::new(
            &base_url,
            cfg.storage.timeout(),
            cfg.storage.max_retries,
        )?;
        Ok(Self::new(generator, store, SessionOptions::from(cfg)))
    }
}

impl<G: Generator, S: ArtifactStore> Controller<G, S> {
    pub fn new(generator: G, store: S, options: SessionOptions) -> Self {
        let session_id = options
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(%session_id, labels = ?options.labels, "session created");
        Self {
            shared: Arc::new(Shared {
                generator,
                store,
                session_id,
                labels: options.labels,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn generator(&self) -> &G {
        &self.shared.generator
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight
    }

    /// Share/export reference for the displayed version.
    pub fn artifact_ref(&self) -> Option<ArtifactRef> {
        self.lock()
            .history
            .current()
            .and_then(Version::artifact_ref)
    }

    /// Record text typed into the input box for the current mode.
    pub fn set_input(&self, text: &str) {
        let mut state = self.lock();
        match state.mode {
            Mode::Query => state.query = text.to_string(),
            Mode::Feedback => state.feedback_input = text.to_string(),
        }
    }

    /// Instruction text reconstructed from the current query, feedback and HTML.
    pub fn prompt(&self) -> anyhow::Result<String> {
        let state = self.lock();
        construct_prompt(&PromptInputs {
            query: &state.query,
            feedback: &state.feedback_input,
            current_html: &state.displayed_html,
        })
    }

    /// Submit `text` as a query or as feedback, depending on the mode.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, ControllerError> {
        match self.mode() {
            Mode::Query => self.generate(text).await,
            Mode::Feedback => self.submit_feedback(text).await,
        }
    }

    /// Query path: generate from `query` and the HTML on display.
    #[instrument(skip_all, fields(session = %self.shared.session_id))]
    pub async fn generate(&self, query: &str) -> Result<SubmitOutcome, ControllerError> {
        let flight = self.begin_flight()?;
        let request = {
            let mut state = self.lock();
            state.query = query.to_string();
            GenerateRequest::initial(query, &state.displayed_html)
        };

        let response = self.request(&request).await?;
        let Some(html) = non_empty_html(&response) else {
            warn!("generation returned no html");
            return Ok(SubmitOutcome::Empty);
        };

        let (version, index) = {
            let mut state = self.lock();
            let label = state.history.next_label(self.shared.labels);
            let version = Version::new(
                html,
                response.usage,
                self.shared.session_id.clone(),
                label,
            );
            let anchor = state.history.cursor();
            let index = state.history.append_after(anchor, version.clone());
            state.displayed_html = version.html.clone();
            state.mode = Mode::Feedback;
            (version, index)
        };
        drop(flight);
        info!(label = %version.version_label, index, "appended version");

        let persisted = self.persist(&version).await;
        Ok(SubmitOutcome::Appended(Appended {
            version,
            index,
            persisted,
        }))
    }

    /// Feedback path: revise the version under the cursor.
    ///
    /// The new version is appended right after the version the feedback was
    /// attached to, discarding anything that was ahead of it.
    #[instrument(skip_all, fields(session = %self.shared.session_id))]
    pub async fn submit_feedback(&self, feedback: &str) -> Result<SubmitOutcome, ControllerError> {
        let trimmed = feedback.trim();
        if trimmed.is_empty() {
            debug!("blank feedback ignored");
            return Ok(SubmitOutcome::Ignored);
        }

        let flight = self.begin_flight()?;
        let (request, anchor, session_id) = {
            let mut state = self.lock();
            state.feedback_input = feedback.to_string();
            let current = state
                .history
                .update_current(&VersionPatch::feedback(trimmed))?;
            let request = GenerateRequest::revision(&current.html, trimmed);
            let session_id = current.session_id.clone();
            (request, state.history.cursor(), session_id)
        };

        let response = self.request(&request).await?;
        let Some(html) = non_empty_html(&response) else {
            warn!("revision returned no html");
            return Ok(SubmitOutcome::Empty);
        };

        let (version, index) = {
            let mut state = self.lock();
            let label = state.history.next_label(self.shared.labels);
            let version = Version::new(html, response.usage, session_id, label);
            let discarded = anchor.map_or(0, |a| state.history.len().saturating_sub(a + 1));
            let index = state.history.append_after(anchor, version.clone());
            state.displayed_html = version.html.clone();
            // Text typed while the request ran belongs to the next revision.
            if state.feedback_input == feedback {
                state.feedback_input.clear();
            }
            state.mode = Mode::Feedback;
            if discarded > 0 {
                debug!(discarded, "branched history");
            }
            (version, index)
        };
        drop(flight);
        info!(label = %version.version_label, index, "appended version");

        let persisted = self.persist(&version).await;
        Ok(SubmitOutcome::Appended(Appended {
            version,
            index,
            persisted,
        }))
    }

    /// Move through history without touching the network.
    ///
    /// Restores the displayed HTML and feedback input from the target version.
    /// Returns `None` (and changes nothing) at either end of the history.
    pub fn navigate(&self, direction: Direction) -> Option<Version> {
        let mut state = self.lock();
        let target = state.history.navigate(direction)?.clone();
        state.displayed_html = target.html.clone();
        state.feedback_input = target.feedback.clone();
        debug!(?direction, label = %target.version_label, "navigated");
        Some(target)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.shared.state)
    }

    fn begin_flight(&self) -> Result<FlightGuard<'_>, ControllerError> {
        let mut state = self.lock();
        if state.in_flight {
            debug!("submission rejected: request in flight");
            return Err(ControllerError::Busy);
        }
        state.in_flight = true;
        Ok(FlightGuard {
            state: &self.shared.state,
        })
    }

    async fn request(&self, request: &GenerateRequest) -> Result<GenerateResponse, ControllerError> {
        self.shared
            .generator
            .generate(request)
            .await
            .map_err(|err| {
                warn!(error = %err, "generation request failed");
                ControllerError::from(err)
            })
    }

    async fn persist(&self, version: &Version) -> Persisted {
        match self
            .shared
            .store
            .save(&version.session_id, &version.version_label, &version.html)
            .await
        {
            Ok(()) => Persisted::Saved,
            Err(err) => {
                warn!(label = %version.version_label, error = %err, "artifact not persisted");
                Persisted::Failed(err.to_string())
            }
        }
    }
}

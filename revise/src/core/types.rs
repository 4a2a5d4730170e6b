//! Shared deterministic types for session history.
//!
//! These types define stable contracts between the history store, the
//! controller and the wire clients. They do not depend on external state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Timing and token counts reported by the generation service.
///
/// Diagnostic only: never computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Wall-clock generation time in seconds.
    pub total_time: f64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn elapsed_ms(&self) -> u64 {
        (self.total_time * 1000.0).round().max(0.0) as u64
    }

    /// Throughput, or `None` when the service reported no elapsed time.
    pub fn tokens_per_sec(&self) -> Option<u64> {
        if self.total_time > 0.0 {
            Some((self.total_tokens as f64 / self.total_time).round() as u64)
        } else {
            None
        }
    }

    /// One-line footer text, e.g. `"250ms • 4000 tokens/sec"`.
    pub fn summary(&self) -> String {
        match self.tokens_per_sec() {
            Some(rate) => format!("{}ms • {} tokens/sec", self.elapsed_ms(), rate),
            None => format!("{}ms", self.elapsed_ms()),
        }
    }
}

/// One generated artifact snapshot.
///
/// Immutable once appended, except for `feedback`, which is written once
/// right before a revision is requested from this version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub html: String,
    /// Feedback the user attached when requesting the next version from this one.
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub session_id: String,
    /// 1-based ordinal rendered as text.
    pub version_label: String,
}

impl Version {
    /// Create a freshly generated version (no feedback attached yet).
    pub fn new(
        html: impl Into<String>,
        usage: Option<Usage>,
        session_id: impl Into<String>,
        version_label: impl Into<String>,
    ) -> Self {
        Self {
            html: html.into(),
            feedback: String::new(),
            usage,
            session_id: session_id.into(),
            version_label: version_label.into(),
        }
    }

    /// Shallow-merge `patch` into a copy of this version.
    pub fn merged(&self, patch: &VersionPatch) -> Self {
        let mut next = self.clone();
        if let Some(feedback) = &patch.feedback {
            next.feedback = feedback.clone();
        }
        next
    }

    pub fn artifact_ref(&self) -> Option<ArtifactRef> {
        if self.session_id.is_empty() || self.version_label.is_empty() {
            return None;
        }
        Some(ArtifactRef {
            session_id: self.session_id.clone(),
            version_label: self.version_label.clone(),
        })
    }
}

/// Partial update applied to the version under the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPatch {
    pub feedback: Option<String>,
}

impl VersionPatch {
    pub fn feedback(text: impl Into<String>) -> Self {
        Self {
            feedback: Some(text.into()),
        }
    }
}

/// Whether the next submission is an initial query or revision feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Query,
    Feedback,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Query => "query",
            Mode::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Retrieval reference for a persisted version, consumed by share/export links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub session_id: String,
    pub version_label: String,
}

impl ArtifactRef {
    /// Link to the share page for this version.
    pub fn share_url(&self, base_url: &str) -> String {
        format!(
            "{}/share/{}/{}",
            base_url.trim_end_matches('/'),
            self.session_id,
            self.version_label
        )
    }

    /// Link to the raw stored artifact.
    pub fn app_url(&self, base_url: &str) -> String {
        format!(
            "{}/api/apps/{}/{}",
            base_url.trim_end_matches('/'),
            self.session_id,
            self.version_label
        )
    }
}

//! Session configuration stored in `revise.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::label::LabelPolicy;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "revise.toml";

const MAX_STORAGE_RETRIES: u32 = 10;

/// Session configuration (TOML).
///
/// Missing fields default to values suitable for a local development server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviseConfig {
    /// Origin hosting `/api/generate` and `/api/apps/...`.
    pub base_url: String,

    /// Version label policy for new versions.
    pub labels: LabelPolicy,

    /// Fixed session identifier. A fresh UUID is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub generation: GenerationConfig,

    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Per-request timeout for `/api/generate`.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Per-request timeout for artifact uploads.
    pub timeout_secs: u64,

    /// Extra attempts after a retryable upload failure (429, 5xx, network).
    pub max_retries: u32,
}

impl Default for ReviseConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            labels: LabelPolicy::default(),
            session_id: None,
            generation: GenerationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ReviseConfig {
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.generation.timeout_secs == 0 {
            return Err(anyhow!("generation.timeout_secs must be > 0"));
        }
        if self.storage.timeout_secs == 0 {
            return Err(anyhow!("storage.timeout_secs must be > 0"));
        }
        if self.storage.max_retries > MAX_STORAGE_RETRIES {
            return Err(anyhow!(
                "storage.max_retries must be <= {}",
                MAX_STORAGE_RETRIES
            ));
        }
        if let Some(id) = &self.session_id {
            if id.trim().is_empty() || id.contains('/') {
                return Err(anyhow!("session_id must be non-empty and contain no '/'"));
            }
        }
        Ok(())
    }

    /// Parsed `base_url`; only http(s) origins are accepted.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("base_url is not a valid url: {}", self.base_url))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("base_url must use http or https, got '{}'", other)),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ReviseConfig::default()`.
pub fn load_config(path: &Path) -> Result<ReviseConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = ReviseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ReviseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Serialize config as pretty TOML with a trailing newline.
pub fn render_config(cfg: &ReviseConfig) -> Result<String> {
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    Ok(buf)
}

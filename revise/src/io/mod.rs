//! I/O collaborators for sessions.

use anyhow::{Result, anyhow};
use reqwest::Url;

pub mod artifact_store;
pub mod config;
pub mod export;
pub mod generator;

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn api_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("base url cannot carry a path: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

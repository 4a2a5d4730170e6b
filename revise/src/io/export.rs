//! Local HTML export for previewing the displayed version.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Atomically write `html` to `path` (temp file + rename), creating parents.
pub fn write_html(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("html.tmp");
    fs::write(&tmp_path, html)
        .with_context(|| format!("write temp html {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace html {}", path.display()))?;
    debug!(path = %path.display(), bytes = html.len(), "exported html");
    Ok(())
}

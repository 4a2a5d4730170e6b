//! Deterministic prompt assembly for the "show prompt" debug view.
//!
//! The text is rebuilt purely from the current query, pending feedback and
//! displayed HTML. It is not the wire request: the generation service receives
//! those fields separately and builds its own instructions.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

const ARTIFACT_TEMPLATE: &str = include_str!("prompts/artifact.md");

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("artifact", ARTIFACT_TEMPLATE)
        .expect("artifact template should be valid");
    env
});

/// Inputs for [`construct_prompt`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptInputs<'a> {
    pub query: &'a str,
    pub feedback: &'a str,
    pub current_html: &'a str,
}

/// Render the instruction text for the given state.
///
/// Same inputs always give byte-identical output. Query and feedback are
/// trimmed; the HTML is embedded verbatim.
pub fn construct_prompt(inputs: &PromptInputs<'_>) -> Result<String> {
    let template = ENGINE.get_template("artifact")?;
    let rendered = template.render(context! {
        query => Some(inputs.query.trim()).filter(|s| !s.is_empty()),
        feedback => Some(inputs.feedback.trim()).filter(|s| !s.is_empty()),
        current_html => Some(inputs.current_html).filter(|s| !s.trim().is_empty()),
    })?;
    debug!(bytes = rendered.len(), "rendered prompt");
    Ok(rendered)
}

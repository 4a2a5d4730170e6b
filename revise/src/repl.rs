//! Interactive line-based session front end for `revise session`.
//!
//! Plain lines are submitted as a query (first) or feedback (afterwards).
//! Lines starting with `:` are commands; see [`HELP`].

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::controller::{Appended, Controller, ControllerError, Persisted, SubmitOutcome};
use crate::core::types::{Direction, Mode};
use crate::io::artifact_store::ArtifactStore;
use crate::io::export::write_html;
use crate::io::generator::Generator;

pub const HELP: &str = "\
Commands:
  :prev      show the previous version
  :next      show the next version
  :prompt    print the assembled prompt for the current state
  :history   list versions (the displayed one is marked)
  :share     print share and app links for the displayed version
  :html      print the displayed HTML
  :help      show this help
  :quit      leave the session
Anything else is submitted as a query, then as feedback on the displayed version.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Submit(String),
    Previous,
    Next,
    Prompt,
    History,
    Share,
    Html,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

/// Parse one input line.
pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Blank;
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return ReplCommand::Submit(line.to_string());
    };
    match command {
        "prev" | "p" => ReplCommand::Previous,
        "next" | "n" => ReplCommand::Next,
        "prompt" => ReplCommand::Prompt,
        "history" | "h" => ReplCommand::History,
        "share" => ReplCommand::Share,
        "html" => ReplCommand::Html,
        "help" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Unknown(other.to_string()),
    }
}

/// Settings for [`run_session`].
#[derive(Debug, Clone)]
pub struct ReplOptions {
    /// Query submitted before the first prompt appears.
    pub initial_query: Option<String>,
    /// File refreshed with the displayed HTML after every change.
    pub preview_path: PathBuf,
    /// Origin used for share/app links.
    pub base_url: String,
}

/// Whether the loop keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run the interactive loop until `:quit` or end of input.
pub async fn run_session<G: Generator, S: ArtifactStore>(
    controller: Controller<G, S>,
    options: ReplOptions,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!("{}", "=== revise ===".bright_magenta().bold());
    println!("{}", format!("session {}", controller.session_id()).bright_black());
    println!("{}", "Type :help for commands.".bright_black());

    if let Some(query) = &options.initial_query {
        submit(&controller, query, &options).await;
    }

    loop {
        let prompt = match controller.mode() {
            Mode::Query => "describe your app> ",
            Mode::Feedback => "feedback> ",
        };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let command = parse_line(&line);
        if command != ReplCommand::Blank {
            let _ = editor.add_history_entry(line.as_str());
        }
        if handle_line(&controller, command, &options).await == Flow::Quit {
            break;
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

/// Apply one parsed line. Failures are printed; only `:quit` ends the loop.
pub async fn handle_line<G: Generator, S: ArtifactStore>(
    controller: &Controller<G, S>,
    command: ReplCommand,
    options: &ReplOptions,
) -> Flow {
    debug!(?command, "repl input");
    match command {
        ReplCommand::Submit(text) => submit(controller, &text, options).await,
        ReplCommand::Previous => navigate(controller, Direction::Previous, options),
        ReplCommand::Next => navigate(controller, Direction::Next, options),
        ReplCommand::Prompt => match controller.prompt() {
            Ok(prompt) => println!("{prompt}"),
            Err(err) => println!("{}", format!("prompt unavailable: {err:#}").red()),
        },
        ReplCommand::History => print_history(controller),
        ReplCommand::Share => match controller.artifact_ref() {
            Some(reference) => {
                println!("share: {}", reference.share_url(&options.base_url));
                println!("app:   {}", reference.app_url(&options.base_url));
            }
            None => println!("{}", "nothing to share yet".bright_black()),
        },
        ReplCommand::Html => println!("{}", controller.snapshot().displayed_html),
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Quit => return Flow::Quit,
        ReplCommand::Blank => {}
        ReplCommand::Unknown(name) => {
            println!("{}", format!("unknown command :{name} (try :help)").yellow());
        }
    }
    Flow::Continue
}

async fn submit<G: Generator, S: ArtifactStore>(
    controller: &Controller<G, S>,
    text: &str,
    options: &ReplOptions,
) {
    match controller.submit(text).await {
        Ok(SubmitOutcome::Appended(appended)) => {
            refresh_preview(&options.preview_path, &appended.version.html);
            print_appended(controller, &appended, options);
        }
        Ok(SubmitOutcome::Ignored) => {}
        Ok(SubmitOutcome::Empty) => {
            println!("{}", "the service returned no HTML; try again".yellow());
        }
        Err(ControllerError::Rejected { error, category }) => {
            println!("{}", error.red());
            println!("{}", format!("Category: {category}").bright_black());
        }
        Err(err) => println!("{}", format!("generation failed: {err}").red()),
    }
}

fn navigate<G: Generator, S: ArtifactStore>(
    controller: &Controller<G, S>,
    direction: Direction,
    options: &ReplOptions,
) {
    let Some(version) = controller.navigate(direction) else {
        println!("{}", "no version in that direction".bright_black());
        return;
    };
    refresh_preview(&options.preview_path, &version.html);
    let state = controller.snapshot();
    println!(
        "{}",
        format!(
            "version {} ({}/{})",
            version.version_label,
            state.history.cursor().map_or(0, |c| c + 1),
            state.history.len()
        )
        .bright_cyan()
    );
    if !version.feedback.is_empty() {
        println!("{}", format!("feedback: {}", version.feedback).bright_black());
    }
}

/// Write the preview file; a failure is reported and the session goes on.
fn refresh_preview(path: &Path, html: &str) {
    if let Err(err) = write_html(path, html) {
        warn!(path = %path.display(), error = %format!("{err:#}"), "preview not written");
        println!("{}", format!("warning: preview not written: {err:#}").yellow());
    }
}

fn print_appended<G: Generator, S: ArtifactStore>(
    controller: &Controller<G, S>,
    appended: &Appended,
    options: &ReplOptions,
) {
    let total = controller.snapshot().history.len();
    let mut line = format!(
        "version {} ({}/{}) -> {}",
        appended.version.version_label,
        appended.index + 1,
        total,
        options.preview_path.display()
    );
    if let Some(usage) = &appended.version.usage {
        line.push_str(&format!(" • {}", usage.summary()));
    }
    println!("{}", line.bright_green());
    if let Persisted::Failed(reason) = &appended.persisted {
        println!("{}", format!("warning: version not saved: {reason}").yellow());
    }
}

fn print_history<G: Generator, S: ArtifactStore>(controller: &Controller<G, S>) {
    let state = controller.snapshot();
    if state.history.is_empty() {
        println!("{}", "no versions yet".bright_black());
        return;
    }
    for (index, version) in state.history.versions().iter().enumerate() {
        let marker = if state.history.cursor() == Some(index) {
            ">"
        } else {
            " "
        };
        let feedback = if version.feedback.is_empty() {
            String::new()
        } else {
            format!("  feedback: {}", version.feedback)
        };
        println!(
            "{marker} {:>3}  v{}  {} bytes{}",
            index + 1,
            version.version_label,
            version.html.len(),
            feedback
        );
    }
}

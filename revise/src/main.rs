//! Iterative HTML generation from natural-language instructions.
//!
//! `revise session` starts an interactive session against the generation and
//! storage services configured in `revise.toml`. `revise prompt` prints the
//! assembled prompt for a given state without contacting any service.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use revise::controller::Controller;
use revise::core::prompt::{PromptInputs, construct_prompt};
use revise::io::config::{DEFAULT_CONFIG_PATH, load_config, render_config};
use revise::logging;
use revise::repl::{ReplOptions, run_session};

#[derive(Parser)]
#[command(
    name = "revise",
    version,
    about = "Iteratively generate and revise HTML artifacts"
)]
struct Cli {
    /// Path to the TOML config file (defaults apply when it is missing).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session.
    Session {
        /// Submit this query before the first prompt.
        #[arg(short, long)]
        query: Option<String>,
        /// File refreshed with the displayed HTML.
        #[arg(short, long, default_value = "revise-preview.html")]
        out: PathBuf,
    },
    /// Print the assembled prompt for a query, feedback and HTML.
    Prompt {
        #[arg(short, long)]
        query: String,
        #[arg(short, long, default_value = "")]
        feedback: String,
        /// File holding the current HTML.
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Session { query, out } => cmd_session(&cli.config, query, out).await,
        Command::Prompt {
            query,
            feedback,
            html_file,
        } => cmd_prompt(&query, &feedback, html_file),
        Command::Config => cmd_config(&cli.config),
    }
}

async fn cmd_session(config: &std::path::Path, query: Option<String>, out: PathBuf) -> Result<()> {
    let cfg = load_config(config)?;
    let controller = Controller::from_config(&cfg)?;
    info!(session_id = controller.session_id(), base_url = %cfg.base_url, "starting session");
    run_session(
        controller,
        ReplOptions {
            initial_query: query,
            preview_path: out,
            base_url: cfg.base_url.clone(),
        },
    )
    .await
}

fn cmd_prompt(query: &str, feedback: &str, html_file: Option<PathBuf>) -> Result<()> {
    let current_html = match html_file {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        }
        None => String::new(),
    };
    let prompt = construct_prompt(&PromptInputs {
        query,
        feedback,
        current_html: &current_html,
    })?;
    println!("{prompt}");
    Ok(())
}

fn cmd_config(config: &std::path::Path) -> Result<()> {
    let cfg = load_config(config)?;
    print!("{}", render_config(&cfg)?);
    Ok(())
}

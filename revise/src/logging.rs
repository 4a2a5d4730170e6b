//! Development-time tracing for debugging sessions.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG`. They are never
//! mixed into REPL output or the HTML preview file.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default,
/// e.g. `RUST_LOG=revise=debug revise session`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

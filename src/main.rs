//! teamlog - shared-folder time tracking CLI
//!
//! Developers start, join, end and comment on tasks; each of them writes only
//! their own log files and every read merges the whole team's logs.

use clap::Parser;
use teamlog::cli::Cli;
use teamlog::output::emit_error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only, or debug with --verbose.
    // Keep startup robust in CI/robot envs: ignore invalid/huge filters.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = cli.command_name();
    let mode = cli.output_mode();
    if let Err(err) = cli.run() {
        let _ = emit_error(mode, command, &err);
        std::process::exit(err.exit_code());
    }
}

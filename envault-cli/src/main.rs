//! Envault: sync your .env file and secure files with an Envault server.
//!
//! # Usage
//!
//! ```text
//! envault <server> <environment> <token> [--filename <name>] [--force] [-c]
//! envault [--filename <name>] [--force] [--force-download] [-c]
//! ```
//!
//! The first form runs the one-time setup; the second pulls with the
//! configuration stored in `.envault.json`.

mod commands;
mod ui;

use anyhow::Result;
use clap::Parser;

use commands::EnvaultArgs;

#[derive(Parser, Debug)]
#[command(
    name = "envault",
    version,
    about = "Sync your .env file with Envault.",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    args: EnvaultArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    cli.args.run()
}

/// Diagnostics go to stderr; stdout carries the user-facing report.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

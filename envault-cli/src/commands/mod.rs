//! Argument handling shared by both flows.

pub mod pull;
pub mod setup;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use envault_remote::EnvaultClient;
use envault_sync::{
    Collaborators, RunOptions, RunReport, SetupRequest, SyncOptions, Workspace,
};

use crate::ui::{self, ConsoleProgress, TerminalPrompter};

/// Positionals select setup; without them the stored config is pulled.
#[derive(Args, Debug)]
pub struct EnvaultArgs {
    /// Envault server host (setup only).
    #[arg(hide = true, requires = "environment")]
    pub server: Option<String>,

    /// Environment identifier (setup only).
    #[arg(hide = true, requires = "token")]
    pub environment: Option<String>,

    /// One-time setup token (setup only).
    #[arg(hide = true)]
    pub token: Option<String>,

    /// Enable prompts to create missing variables.
    #[arg(short = 'c', long)]
    pub constructive: bool,

    /// Name of the .env file.
    #[arg(long)]
    pub filename: Option<String>,

    /// Accept all prompts.
    #[arg(long)]
    pub force: bool,

    /// Download secure files even when the local copy matches the server hash.
    #[arg(long)]
    pub force_download: bool,
}

impl EnvaultArgs {
    pub fn run(self) -> Result<()> {
        let root = std::env::current_dir().context("could not determine current directory")?;
        let workspace = Workspace::new(root);
        let options = self.run_options();

        let report = match (self.server, self.environment, self.token) {
            (Some(server), Some(environment), Some(token)) => {
                let request = SetupRequest {
                    server,
                    environment,
                    token,
                };
                setup::run(&workspace, &request, &options)?
            }
            (None, None, None) => pull::run(&workspace, &options)?,
            _ => bail!("server, environment and token must be given together"),
        };

        ui::print_report(&workspace, &report);
        fail_on_download_errors(&report)
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            constructive: self.constructive,
            force: self.force,
            filename: self.filename.clone(),
            files: SyncOptions {
                force_download: self.force_download,
                ..SyncOptions::default()
            },
        }
    }
}

/// The network, terminal and progress display used by both flows.
fn collaborators(remote: &EnvaultClient) -> Collaborators<'_> {
    Collaborators {
        remote,
        prompter: &TerminalPrompter,
        progress: Arc::new(ConsoleProgress::default()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn fail_on_download_errors(report: &RunReport) -> Result<()> {
    let failed = report
        .files
        .report()
        .map(|files| files.failed.len())
        .unwrap_or(0);
    if failed > 0 {
        bail!("{failed} secure file(s) failed to download");
    }
    Ok(())
}

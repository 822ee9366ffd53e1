//! `envault`: pull the latest variables with the stored configuration.

use anyhow::{Context, Result};

use envault_remote::EnvaultClient;
use envault_sync::{RunOptions, RunReport, Workspace};

use crate::ui;

pub fn run(workspace: &Workspace, options: &RunOptions) -> Result<RunReport> {
    ui::print_welcome();

    let remote = EnvaultClient::new().context("failed to build HTTP client")?;
    let collab = super::collaborators(&remote);
    let report = super::runtime()?.block_on(envault_sync::pull(workspace, &collab, options))?;
    Ok(report)
}

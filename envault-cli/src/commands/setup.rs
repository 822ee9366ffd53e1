//! `envault <server> <environment> <token>`: first-time setup.

use anyhow::{Context, Result};

use envault_remote::EnvaultClient;
use envault_sync::{RunOptions, RunReport, SetupRequest, Workspace};

use crate::ui;

pub fn run(workspace: &Workspace, request: &SetupRequest, options: &RunOptions) -> Result<RunReport> {
    ui::print_welcome();

    let remote = EnvaultClient::new().context("failed to build HTTP client")?;
    let collab = super::collaborators(&remote);
    let report = super::runtime()?.block_on(envault_sync::setup(
        workspace, request, &collab, options,
    ))?;
    Ok(report)
}

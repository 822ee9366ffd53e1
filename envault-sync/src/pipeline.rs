//! Setup and pull flows.
//!
//! ```text
//! UNCONFIGURED --setup--> CONFIGURED --pull--> CONFIGURED
//! ```
//!
//! Both flows take every input as a value: the [`Workspace`] paths, the
//! [`RunOptions`] flags and the [`Collaborators`] that reach the network and
//! the user.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use envault_core::{config, RemoteFile, SyncConfig, UpdateRecord, Variable};

use crate::document::EnvDocument;
use crate::error::{io_err, Flow, RemoteError, SyncError};
use crate::merge::{merge, MergePolicy};
use crate::prompt::{confirm_unless_forced, Prompter};
use crate::remote::Remote;
use crate::secure_files::{
    sync_secure_files, ProgressEvent, ProgressSink, Stage, SyncOptions, SyncReport,
    SECURE_FILES_DIR,
};
use crate::writer::write_env_file;

/// Env file name used when neither the flag nor the stored config names one.
pub const DEFAULT_ENV_FILE: &str = ".env";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where a run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub secure_files_dir: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let secure_files_dir = root.join(SECURE_FILES_DIR);
        Self {
            root,
            secure_files_dir,
        }
    }

    pub fn env_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

/// Positional arguments of the setup flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    pub server: String,
    pub environment: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Offer to add variables missing from the env file.
    pub constructive: bool,
    /// Accept every prompt.
    pub force: bool,
    /// Env file name override.
    pub filename: Option<String>,
    pub files: SyncOptions,
}

/// The network, the user and the progress display.
pub struct Collaborators<'a> {
    pub remote: &'a dyn Remote,
    pub prompter: &'a dyn Prompter,
    pub progress: Arc<dyn ProgressSink>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// What happened to the secure files during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSync {
    Synced(SyncReport),
    /// The directory was not empty and the user chose to keep it.
    Declined,
    /// The snapshot carried no file manifest.
    NotRequested,
}

impl FileSync {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            FileSync::Synced(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub flow: Flow,
    pub filename: String,
    pub files: FileSync,
    pub env_file_created: bool,
    pub gitignore_updated: bool,
    pub updates: Vec<UpdateRecord>,
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// First-time setup: handshake, files, env file, config, merge.
pub async fn setup(
    workspace: &Workspace,
    request: &SetupRequest,
    collab: &Collaborators<'_>,
    options: &RunOptions,
) -> Result<RunReport, SyncError> {
    let filename = options
        .filename
        .clone()
        .unwrap_or_else(|| DEFAULT_ENV_FILE.to_string());

    collab.progress.report(ProgressEvent::Stage(Stage::Connecting));
    let snapshot = collab
        .remote
        .setup(&request.server, &request.environment, &request.token)
        .await?;
    if snapshot.auth_token.is_empty() {
        return Err(RemoteError::InvalidSetupToken.into());
    }
    collab.progress.report(ProgressEvent::Stage(Stage::Connected));

    let files = sync_setup_files(workspace, request, &snapshot.app.files, collab, options).await?;

    let env_path = workspace.env_path(&filename);
    let (content, env_file_created) = ensure_env_file(
        &env_path,
        &filename,
        &snapshot.app.variables,
        Flow::Setup,
        collab.prompter,
        options.force,
    )?;

    config::save_at(
        &workspace.root,
        &SyncConfig {
            auth_token: snapshot.auth_token.clone(),
            environment: request.environment.clone(),
            filename: filename.clone(),
            server: request.server.clone(),
        },
    )?;
    let gitignore_updated = config::add_to_gitignore_at(&workspace.root)?;

    let updates = merge_and_write(
        &env_path,
        &filename,
        &content,
        &snapshot.app.variables,
        collab.prompter,
        options,
    )?;

    Ok(RunReport {
        flow: Flow::Setup,
        filename,
        files,
        env_file_created,
        gitignore_updated,
        updates,
    })
}

/// Pull the latest variables using the persisted config.
pub async fn pull(
    workspace: &Workspace,
    collab: &Collaborators<'_>,
    options: &RunOptions,
) -> Result<RunReport, SyncError> {
    let config = config::load_at(&workspace.root)?.ok_or(SyncError::NotInitialized)?;
    let filename = options
        .filename
        .clone()
        .or_else(|| Some(config.filename.clone()).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| DEFAULT_ENV_FILE.to_string());

    collab.progress.report(ProgressEvent::Stage(Stage::Connecting));
    let snapshot = collab.remote.update(&config).await?;
    collab.progress.report(ProgressEvent::Stage(Stage::Connected));

    let files = match &snapshot.files {
        Some(manifest) => {
            let source =
                collab
                    .remote
                    .file_source(&config.server, &config.environment, &config.auth_token);
            let report = sync_secure_files(
                &workspace.secure_files_dir,
                manifest,
                source,
                collab.progress.clone(),
                &options.files,
            )
            .await?;
            FileSync::Synced(report)
        }
        None => FileSync::NotRequested,
    };

    let env_path = workspace.env_path(&filename);
    let (content, env_file_created) = ensure_env_file(
        &env_path,
        &filename,
        &snapshot.variables,
        Flow::Pull,
        collab.prompter,
        options.force,
    )?;

    let updates = merge_and_write(
        &env_path,
        &filename,
        &content,
        &snapshot.variables,
        collab.prompter,
        options,
    )?;

    Ok(RunReport {
        flow: Flow::Pull,
        filename,
        files,
        env_file_created,
        gitignore_updated: false,
        updates,
    })
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

async fn sync_setup_files(
    workspace: &Workspace,
    request: &SetupRequest,
    manifest: &[RemoteFile],
    collab: &Collaborators<'_>,
    options: &RunOptions,
) -> Result<FileSync, SyncError> {
    let dir = &workspace.secure_files_dir;
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let non_empty = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .next()
        .is_some();
    if non_empty {
        let prompt = format!(
            "Directory {} is not empty! If you continue, all files in this directory will be replaced with server files. Continue?",
            dir.display()
        );
        if !confirm_unless_forced(collab.prompter, options.force, &prompt) {
            tracing::warn!(dir = %dir.display(), "file synchronization skipped; directory not empty");
            return Ok(FileSync::Declined);
        }
    }

    let source = collab
        .remote
        .file_source(&request.server, &request.environment, &request.token);
    let report =
        sync_secure_files(dir, manifest, source, collab.progress.clone(), &options.files).await?;
    Ok(FileSync::Synced(report))
}

/// Read the env file, creating it with empty `KEY=` lines when missing.
fn ensure_env_file(
    path: &Path,
    filename: &str,
    variables: &[Variable],
    flow: Flow,
    prompter: &dyn Prompter,
    force: bool,
) -> Result<(String, bool), SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok((content, false)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let prompt =
                format!("A {filename} file was not found. Would you like to create a new one?");
            if !confirm_unless_forced(prompter, force, &prompt) {
                return Err(SyncError::EnvFileDeclined {
                    flow,
                    filename: filename.to_string(),
                });
            }
            let content =
                EnvDocument::with_empty_keys(variables.iter().map(|v| v.key.as_str())).render();
            write_env_file(path, &content)?;
            Ok((content, true))
        }
        Err(e) => Err(io_err(path, e)),
    }
}

fn merge_and_write(
    path: &Path,
    filename: &str,
    content: &str,
    variables: &[Variable],
    prompter: &dyn Prompter,
    options: &RunOptions,
) -> Result<Vec<UpdateRecord>, SyncError> {
    let outcome = merge(
        content,
        variables,
        &MergePolicy {
            constructive: options.constructive,
            force: options.force,
            filename,
            prompter,
        },
    );
    write_env_file(path, &outcome.content)?;
    Ok(outcome.updates)
}

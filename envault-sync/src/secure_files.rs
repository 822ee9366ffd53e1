//! Secure file synchronizer.
//!
//! ## `sync_secure_files`: 3-step protocol
//!
//! 1. Reconcile: delete every file under `dir` whose base name is not in the
//!    manifest. Runs to completion before any download starts.
//! 2. Decide per entry: skip when the local file exists, its MD5 matches the
//!    manifest and `force_download` is off.
//! 3. Download the rest concurrently, one task per file, into
//!    `<name>.envault.tmp` and rename on completion.
//!
//! A failing task becomes a [`FileError`] in the report; siblings keep going.
//! Only the first manifest entry with a given name is downloaded; repeats are
//! reported as failures.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use envault_core::RemoteFile;

use crate::error::{io_err, RemoteError, SyncError};
use crate::hash::{digests_match, md5_file};
use crate::remote::FileSource;

/// Default directory for secure files, relative to the project root.
pub const SECURE_FILES_DIR: &str = ".secure_files";

/// Longest a single open or chunk read may stall before the file fails.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(30);

const TMP_SUFFIX: &str = "envault.tmp";

const DUPLICATE_ENTRY: &str = "listed more than once in the server manifest";

// ---------------------------------------------------------------------------
// Options, progress and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Download every manifest entry, even when the local hash matches.
    pub force_download: bool,
    pub stall_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force_download: false,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

/// Coarse phases of a run, for user-facing status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connecting,
    Connected,
    Reconciling,
    Downloading,
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    Stage(Stage),
    /// Local copy is current; nothing transferred.
    Skipped { name: &'a str },
    Started { name: &'a str, total: Option<u64> },
    Advanced {
        name: &'a str,
        written: u64,
        total: Option<u64>,
    },
    Finished { name: &'a str, written: u64 },
    Failed { name: &'a str, message: &'a str },
}

/// Receives progress notifications. Called from several tasks at once.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent<'_>) {}
}

/// A download that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub name: String,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Outcome of one synchronizer pass, entries in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted: Vec<PathBuf>,
    pub skipped: Vec<String>,
    pub downloaded: Vec<String>,
    pub failed: Vec<FileError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Bring `dir` in line with `manifest`.
///
/// Returns `Err` only when reconciliation cannot complete; download problems
/// are reported per file in [`SyncReport::failed`].
pub async fn sync_secure_files(
    dir: &Path,
    manifest: &[RemoteFile],
    source: Arc<dyn FileSource>,
    progress: Arc<dyn ProgressSink>,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| io_err(dir, e))?;

    progress.report(ProgressEvent::Stage(Stage::Reconciling));
    let deleted = reconcile(dir, manifest)?;

    progress.report(ProgressEvent::Stage(Stage::Downloading));
    // Later entries sharing a name would race the first one for the same paths.
    let mut seen = HashSet::new();
    let handles: Vec<_> = manifest
        .iter()
        .map(|file| {
            if !seen.insert(file.name.as_str()) {
                let message = DUPLICATE_ENTRY.to_string();
                tracing::warn!(file = %file.name, "{message}");
                progress.report(ProgressEvent::Failed {
                    name: &file.name,
                    message: &message,
                });
                return (file.name.clone(), Err(message));
            }
            let task = sync_one(
                dir.to_path_buf(),
                file.clone(),
                source.clone(),
                progress.clone(),
                options.clone(),
            );
            (file.name.clone(), Ok(tokio::spawn(task)))
        })
        .collect();

    let mut report = SyncReport {
        deleted,
        ..SyncReport::default()
    };
    for (name, handle) in handles {
        let handle = match handle {
            Ok(handle) => handle,
            Err(message) => {
                report.failed.push(FileError { name, message });
                continue;
            }
        };
        match handle.await {
            Ok(FileOutcome::Skipped) => report.skipped.push(name),
            Ok(FileOutcome::Downloaded) => report.downloaded.push(name),
            Ok(FileOutcome::Failed(message)) => report.failed.push(FileError { name, message }),
            Err(err) => {
                tracing::error!(file = %name, error = %err, "download task did not complete");
                report.failed.push(FileError {
                    name,
                    message: format!("download task did not complete: {err}"),
                });
            }
        }
    }

    tracing::info!(
        deleted = report.deleted.len(),
        skipped = report.skipped.len(),
        downloaded = report.downloaded.len(),
        failed = report.failed.len(),
        "secure files synchronized"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Step 1: reconciliation
// ---------------------------------------------------------------------------

/// Delete files under `dir` whose base name is not in the manifest.
///
/// Matching is by base name only, so a listed name satisfies the manifest in
/// any subdirectory.
pub fn reconcile(dir: &Path, manifest: &[RemoteFile]) -> Result<Vec<PathBuf>, SyncError> {
    let keep: HashSet<&str> = manifest.iter().map(|f| base_name(&f.name)).collect();
    let mut deleted = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|err| {
            let path = err.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            io_err(path, err.into())
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if keep.contains(&*name) {
            continue;
        }

        std::fs::remove_file(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        tracing::info!(path = %entry.path().display(), "deleted file missing from server");
        deleted.push(entry.into_path());
    }

    Ok(deleted)
}

fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

// ---------------------------------------------------------------------------
// Steps 2 + 3: per-file decision and download
// ---------------------------------------------------------------------------

enum FileOutcome {
    Skipped,
    Downloaded,
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no data received for {0:?}")]
    Stalled(Duration),
}

fn fetch_io(path: &Path, source: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn sync_one(
    dir: PathBuf,
    file: RemoteFile,
    source: Arc<dyn FileSource>,
    progress: Arc<dyn ProgressSink>,
    options: SyncOptions,
) -> FileOutcome {
    match try_sync_one(&dir, &file, source.as_ref(), progress.as_ref(), &options).await {
        Ok(false) => FileOutcome::Skipped,
        Ok(true) => FileOutcome::Downloaded,
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(file = %file.name, error = %message, "secure file download failed");
            progress.report(ProgressEvent::Failed {
                name: &file.name,
                message: &message,
            });
            FileOutcome::Failed(message)
        }
    }
}

/// Returns `Ok(true)` when the file was downloaded, `Ok(false)` when skipped.
async fn try_sync_one(
    dir: &Path,
    file: &RemoteFile,
    source: &dyn FileSource,
    progress: &dyn ProgressSink,
    options: &SyncOptions,
) -> Result<bool, FetchError> {
    let target = target_path(dir, &file.name)?;
    if !options.force_download && is_current(&target, file).await {
        tracing::debug!(file = %file.name, "local hash matches server; skip download");
        progress.report(ProgressEvent::Skipped { name: &file.name });
        return Ok(false);
    }
    download(&target, file, source, progress, options.stall_timeout).await?;
    Ok(true)
}

/// Resolve a manifest name inside `dir`, refusing anything that escapes it.
fn target_path(dir: &Path, name: &str) -> Result<PathBuf, FetchError> {
    let relative = Path::new(name);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if name.is_empty() || !plain {
        return Err(FetchError::InvalidName(name.to_string()));
    }
    Ok(dir.join(relative))
}

async fn is_current(target: &Path, file: &RemoteFile) -> bool {
    if !tokio::fs::try_exists(target).await.unwrap_or(false) {
        return false;
    }
    match md5_file(target).await {
        Ok(digest) => digests_match(&digest, &file.content_hash),
        Err(err) => {
            tracing::warn!(path = %target.display(), error = %err, "could not hash local file; downloading again");
            false
        }
    }
}

/// Removes the partial download on drop unless it was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn download(
    target: &Path,
    file: &RemoteFile,
    source: &dyn FileSource,
    progress: &dyn ProgressSink,
    stall: Duration,
) -> Result<u64, FetchError> {
    let mut stream = tokio::time::timeout(stall, source.open(file))
        .await
        .map_err(|_| FetchError::Stalled(stall))??;
    let total = stream.declared_len();
    progress.report(ProgressEvent::Started {
        name: &file.name,
        total,
    });

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fetch_io(parent, e))?;
    }

    let mut partial = PartialFile {
        path: PathBuf::from(format!("{}.{TMP_SUFFIX}", target.display())),
        committed: false,
    };
    let mut out = tokio::fs::File::create(&partial.path)
        .await
        .map_err(|e| fetch_io(&partial.path, e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = tokio::time::timeout(stall, stream.next_chunk())
        .await
        .map_err(|_| FetchError::Stalled(stall))??
    {
        out.write_all(&chunk)
            .await
            .map_err(|e| fetch_io(&partial.path, e))?;
        written += chunk.len() as u64;
        progress.report(ProgressEvent::Advanced {
            name: &file.name,
            written,
            total,
        });
    }

    out.flush().await.map_err(|e| fetch_io(&partial.path, e))?;
    drop(out);

    tokio::fs::rename(&partial.path, target)
        .await
        .map_err(|e| fetch_io(target, e))?;
    partial.committed = true;

    tracing::info!(file = %file.name, bytes = written, "downloaded secure file");
    progress.report(ProgressEvent::Finished {
        name: &file.name,
        written,
    });
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

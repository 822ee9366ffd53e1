//! Atomic env-file writer.
//!
//! 1. Compare with the current on-disk content → skip if identical.
//! 2. Write to `<path>.envault.tmp`.
//! 3. Rename to the final path (atomic on POSIX).
//!
//! A failed rename removes the `.tmp` file and leaves the original intact.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Outcome of writing an env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// On-disk content already matches.
    Unchanged { path: PathBuf },
}

/// Atomically replace the file at `path` with `content`.
pub fn write_env_file(path: &Path, content: &str) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.envault.tmp", path.display()));
    write_env_file_with_tmp(path, content, &tmp)
}

fn write_env_file_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<WriteResult, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(existing) if existing == content => {
            tracing::debug!(path = %path.display(), "env file unchanged");
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!(path = %path.display(), "wrote env file");
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

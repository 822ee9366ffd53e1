//! Persisted sync configuration.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   .envault.json   (SyncConfig: mode 0600)
//!   .gitignore      (gets a `.envault.json` line after setup)
//! ```
//!
//! Every function takes the project root explicitly; nothing here reads the
//! process working directory.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::SyncConfig;

/// File name of the persisted config, relative to the project root.
pub const CONFIG_FILE: &str = ".envault.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/.envault.json`: pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<root>/.gitignore`: pure, no I/O.
pub fn gitignore_path_at(root: &Path) -> PathBuf {
    root.join(".gitignore")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the config stored under `root`.
///
/// Returns `Ok(None)` when the file does not exist, and
/// [`ConfigError::Parse`] (with the path) when it is malformed.
pub fn load_at(root: &Path) -> Result<Option<SyncConfig>, ConfigError> {
    let path = config_path_at(root);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config =
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    Ok(Some(config))
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<root>/.envault.json`.
///
/// Write flow: serialize → `.envault.json.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(root: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let path = config_path_at(root);
    let tmp = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!(path = %path.display(), "saved sync config");
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. .gitignore
// ---------------------------------------------------------------------------

/// Make sure `.envault.json` is listed in `<root>/.gitignore`.
///
/// Creates the file when absent. Returns `true` when the file was changed.
pub fn add_to_gitignore_at(root: &Path) -> Result<bool, ConfigError> {
    let path = gitignore_path_at(root);
    let existing = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_err(&path, e)),
    };

    if existing.lines().any(|line| line.trim() == CONFIG_FILE) {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(CONFIG_FILE);
    updated.push('\n');
    std::fs::write(&path, updated).map_err(|e| io_err(&path, e))?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

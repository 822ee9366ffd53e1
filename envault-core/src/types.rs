//! Domain types shared by the merge engine, the file synchronizer and the
//! remote client.
//!
//! Wire field names follow the Envault HTTP API (`latest_version`, `md5`,
//! `authToken`); Rust field names follow Rust conventions.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The name of a variable as it appears on the left of `=` in an env file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableKey(pub String);

impl VariableKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VariableKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VariableKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Snapshot payloads
// ---------------------------------------------------------------------------

/// One published version of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableVersion {
    pub id: u64,
    pub value: String,
}

/// A remote variable together with its latest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: VariableKey,
    pub latest_version: VariableVersion,
}

impl Variable {
    pub fn new(key: impl Into<VariableKey>, id: u64, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            latest_version: VariableVersion {
                id,
                value: value.into(),
            },
        }
    }
}

/// A secure file entry in the remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub uuid: String,
    /// Lowercase hex MD5 of the expected content.
    #[serde(rename = "md5")]
    pub content_hash: String,
}

/// The application part of a setup response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Response of the one-time setup handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupSnapshot {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub app: AppSnapshot,
}

/// Response of the update endpoint used on every pull.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateSnapshot {
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Present only when the server also publishes a refreshed file manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<RemoteFile>>,
}

// ---------------------------------------------------------------------------
// Persisted config and reports
// ---------------------------------------------------------------------------

/// The record written at setup and read on every pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub auth_token: String,
    pub environment: String,
    pub filename: String,
    pub server: String,
}

/// A variable the merge engine changed, for reporting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub key: VariableKey,
    pub new_version_id: u64,
}

impl fmt::Display for UpdateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to v{}", self.key, self.new_version_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

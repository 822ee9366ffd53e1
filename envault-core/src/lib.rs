//! Envault core library: domain types, env-file parsing, persisted config.
//!
//! - [`types`]: snapshot payloads, [`SyncConfig`], [`UpdateRecord`]
//! - [`dotenv`]: the env-file parser used for key detection and value decoding
//! - [`config`]: load / save `.envault.json` and keep it out of git
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod dotenv;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    AppSnapshot, RemoteFile, SetupSnapshot, SyncConfig, UpdateRecord, UpdateSnapshot, Variable,
    VariableKey, VariableVersion,
};

//! # envault-sync
//!
//! Merge engine, secure file synchronizer and the setup/pull flows.
//!
//! Call [`pipeline::setup`] once with a setup token, then [`pipeline::pull`]
//! on every later run. The building blocks ([`merge::merge`],
//! [`secure_files::sync_secure_files`]) are usable on their own.

pub mod document;
pub mod error;
pub mod hash;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod remote;
pub mod secure_files;
pub mod writer;

pub use document::EnvDocument;
pub use error::{Flow, RemoteError, SyncError};
pub use merge::{merge, MergeOutcome, MergePolicy};
pub use pipeline::{
    pull, setup, Collaborators, FileSync, RunOptions, RunReport, SetupRequest, Workspace,
};
pub use prompt::Prompter;
pub use remote::{ByteStream, FileSource, Remote};
pub use secure_files::{
    sync_secure_files, FileError, NoProgress, ProgressEvent, ProgressSink, Stage, SyncOptions,
    SyncReport,
};
pub use writer::{write_env_file, WriteResult};

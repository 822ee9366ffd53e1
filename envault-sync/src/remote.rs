//! Seams to the remote service.
//!
//! The orchestrator only talks to these traits; `envault-remote` provides the
//! HTTP implementation and tests provide in-memory ones.

use std::sync::Arc;

use async_trait::async_trait;

use envault_core::{RemoteFile, SetupSnapshot, SyncConfig, UpdateSnapshot};

use crate::error::RemoteError;

/// An open download: the declared length plus a chunk reader.
#[async_trait]
pub trait ByteStream: Send {
    /// Total size announced by the server (`Content-Length`), if any.
    fn declared_len(&self) -> Option<u64>;

    /// Next chunk of the body, or `None` once the body is complete.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError>;
}

/// Opens byte streams for secure files of one environment.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn open(&self, file: &RemoteFile) -> Result<Box<dyn ByteStream>, RemoteError>;
}

/// The authentication and snapshot endpoints.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Exchange a one-time setup token for an auth token and initial snapshot.
    async fn setup(
        &self,
        server: &str,
        environment: &str,
        token: &str,
    ) -> Result<SetupSnapshot, RemoteError>;

    /// Fetch the latest variables using the persisted auth token.
    async fn update(&self, config: &SyncConfig) -> Result<UpdateSnapshot, RemoteError>;

    /// Download source for secure files, authorised by `token`.
    fn file_source(&self, server: &str, environment: &str, token: &str) -> Arc<dyn FileSource>;
}

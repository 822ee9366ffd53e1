//! reqwest client for the Envault server.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use envault_core::{RemoteFile, SetupSnapshot, SyncConfig, UpdateSnapshot};
use envault_sync::{ByteStream, FileSource, Remote, RemoteError};

/// Upper bound on establishing a connection. Stalled bodies are bounded
/// separately by the synchronizer's per-chunk timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URL of one environment.
///
/// A bare host gets `https://`; a server given with an explicit scheme is
/// used as-is.
pub fn app_url(server: &str, environment: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("https://") || server.starts_with("http://") {
        format!("{server}/api/v1/apps/{environment}")
    } else {
        format!("https://{server}/api/v1/apps/{environment}")
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Talks to the setup, update and download endpoints.
#[derive(Debug, Clone)]
pub struct EnvaultClient {
    http: reqwest::Client,
}

impl EnvaultClient {
    pub fn new() -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("envault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Remote for EnvaultClient {
    async fn setup(
        &self,
        server: &str,
        environment: &str,
        token: &str,
    ) -> Result<SetupSnapshot, RemoteError> {
        let url = format!("{}/setup/{token}", app_url(server, environment));
        tracing::debug!(server, environment, "requesting setup");

        let resp = self.http.post(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "setup rejected");
            return Err(RemoteError::InvalidSetupToken);
        }
        resp.json::<SetupSnapshot>().await.map_err(transport)
    }

    async fn update(&self, config: &SyncConfig) -> Result<UpdateSnapshot, RemoteError> {
        let url = format!("{}/update", app_url(&config.server, &config.environment));
        tracing::debug!(
            server = %config.server,
            environment = %config.environment,
            "requesting update"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&config.auth_token)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "update rejected");
            return Err(RemoteError::InvalidSession);
        }
        resp.json::<UpdateSnapshot>().await.map_err(transport)
    }

    fn file_source(&self, server: &str, environment: &str, token: &str) -> Arc<dyn FileSource> {
        Arc::new(HttpFileSource {
            http: self.http.clone(),
            base: format!("{}/download/{token}/file", app_url(server, environment)),
        })
    }
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

/// Streams secure files of one environment.
#[derive(Debug, Clone)]
pub struct HttpFileSource {
    http: reqwest::Client,
    base: String,
}

#[async_trait]
impl FileSource for HttpFileSource {
    async fn open(&self, file: &RemoteFile) -> Result<Box<dyn ByteStream>, RemoteError> {
        let url = format!("{}/{}", self.base, file.uuid);
        let resp = self.http.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
            });
        }
        Ok(Box::new(HttpStream { resp }))
    }
}

struct HttpStream {
    resp: reqwest::Response,
}

#[async_trait]
impl ByteStream for HttpStream {
    fn declared_len(&self) -> Option<u64> {
        self.resp.content_length()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError> {
        let chunk = self.resp.chunk().await.map_err(transport)?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

/// Flatten a reqwest error and its causes into one line.
///
/// URLs are stripped: they carry setup and auth tokens.
fn transport(e: reqwest::Error) -> RemoteError {
    let e = e.without_url();
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    RemoteError::Transport(message)
}

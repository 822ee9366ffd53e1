#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use envault_core::{
    AppSnapshot, RemoteFile, SetupSnapshot, SyncConfig, UpdateSnapshot, Variable,
};
use envault_sync::{
    hash::md5_bytes, ByteStream, FileSource, ProgressEvent, ProgressSink, Remote, RemoteError,
};

// ---------------------------------------------------------------------------
// Download source
// ---------------------------------------------------------------------------

/// How the in-memory server answers a download.
#[derive(Clone)]
pub enum Served {
    Bytes(Vec<u8>),
    /// `open` itself fails.
    Refused(String),
    /// Some bytes arrive, then the stream errors.
    BrokenAfter(Vec<u8>),
    /// Some bytes arrive, then nothing ever again.
    StallAfter(Vec<u8>),
}

#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Served>,
    pub opened: Mutex<Vec<String>>,
    pub bytes_served: Arc<AtomicU64>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `served` for the manifest entry with this `uuid`.
    pub fn with(mut self, uuid: &str, served: Served) -> Self {
        self.files.insert(uuid.to_string(), served);
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn bytes_served(&self) -> u64 {
        self.bytes_served.load(Ordering::SeqCst)
    }
}

enum Tail {
    End,
    Error(String),
    Stall,
}

struct MemoryStream {
    declared: Option<u64>,
    chunks: VecDeque<Vec<u8>>,
    tail: Tail,
    counter: Arc<AtomicU64>,
}

impl MemoryStream {
    fn new(bytes: &[u8], tail: Tail, counter: Arc<AtomicU64>) -> Self {
        Self {
            declared: Some(bytes.len() as u64),
            chunks: bytes.chunks(4).map(<[u8]>::to_vec).collect(),
            tail,
            counter,
        }
    }
}

#[async_trait]
impl ByteStream for MemoryStream {
    fn declared_len(&self) -> Option<u64> {
        self.declared
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError> {
        if let Some(chunk) = self.chunks.pop_front() {
            self.counter.fetch_add(chunk.len() as u64, Ordering::SeqCst);
            return Ok(Some(chunk));
        }
        match &self.tail {
            Tail::End => Ok(None),
            Tail::Error(message) => Err(RemoteError::Transport(message.clone())),
            Tail::Stall => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn open(&self, file: &RemoteFile) -> Result<Box<dyn ByteStream>, RemoteError> {
        self.opened.lock().unwrap().push(file.name.clone());
        let counter = self.bytes_served.clone();
        match self.files.get(&file.uuid) {
            Some(Served::Bytes(bytes)) => Ok(Box::new(MemoryStream::new(bytes, Tail::End, counter))),
            Some(Served::BrokenAfter(bytes)) => Ok(Box::new(MemoryStream::new(
                bytes,
                Tail::Error("connection reset".to_string()),
                counter,
            ))),
            Some(Served::StallAfter(bytes)) => {
                Ok(Box::new(MemoryStream::new(bytes, Tail::Stall, counter)))
            }
            Some(Served::Refused(message)) => Err(RemoteError::Transport(message.clone())),
            None => Err(RemoteError::Status { status: 404 }),
        }
    }
}

/// A manifest entry whose hash matches `content`.
pub fn remote_file(name: &str, content: &[u8]) -> RemoteFile {
    RemoteFile {
        name: name.to_string(),
        uuid: format!("uuid-{name}"),
        content_hash: md5_bytes(content),
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

pub struct FakeRemote {
    pub setup: Option<SetupSnapshot>,
    pub update: Option<UpdateSnapshot>,
    pub source: Arc<MemorySource>,
    pub file_tokens: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn for_setup(auth_token: &str, files: Vec<RemoteFile>, variables: Vec<Variable>) -> Self {
        Self {
            setup: Some(SetupSnapshot {
                auth_token: auth_token.to_string(),
                app: AppSnapshot { files, variables },
            }),
            update: None,
            source: Arc::new(MemorySource::new()),
            file_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn for_update(variables: Vec<Variable>, files: Option<Vec<RemoteFile>>) -> Self {
        Self {
            setup: None,
            update: Some(UpdateSnapshot { variables, files }),
            source: Arc::new(MemorySource::new()),
            file_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            setup: None,
            update: None,
            source: Arc::new(MemorySource::new()),
            file_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn serving(mut self, source: MemorySource) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn file_tokens(&self) -> Vec<String> {
        self.file_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn setup(
        &self,
        _server: &str,
        _environment: &str,
        _token: &str,
    ) -> Result<SetupSnapshot, RemoteError> {
        self.setup.clone().ok_or(RemoteError::InvalidSetupToken)
    }

    async fn update(&self, _config: &SyncConfig) -> Result<UpdateSnapshot, RemoteError> {
        self.update.clone().ok_or(RemoteError::InvalidSession)
    }

    fn file_source(&self, _server: &str, _environment: &str, token: &str) -> Arc<dyn FileSource> {
        self.file_tokens.lock().unwrap().push(token.to_string());
        self.source.clone()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, event: ProgressEvent<'_>) {
        let line = match event {
            ProgressEvent::Stage(stage) => format!("stage {stage:?}"),
            ProgressEvent::Skipped { name } => format!("skipped {name}"),
            ProgressEvent::Started { name, total } => format!("started {name} {total:?}"),
            ProgressEvent::Advanced { name, written, .. } => format!("advanced {name} {written}"),
            ProgressEvent::Finished { name, written } => format!("finished {name} {written}"),
            ProgressEvent::Failed { name, .. } => format!("failed {name}"),
        };
        self.events.lock().unwrap().push(line);
    }
}

//! Shared test helpers and a scripted backend.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use canopy::error::{CanopyError, Result};
use canopy::transport::{ByteStream, ChatBackend};
use canopy::types::*;

/// How the next completion call behaves.
pub enum Reply {
    /// Stream these chunks, then end.
    Chunks(Vec<Vec<u8>>),
    /// Fail before any chunk with this status and body.
    Status(u16, String),
    /// Stream these chunks, then fail.
    BreakAfter(Vec<Vec<u8>>, String),
}

impl Reply {
    pub fn text(chunks: &[&str]) -> Self {
        Self::Chunks(chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }
}

/// A backend that replays queued replies and records what it was sent.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    ingests: Mutex<VecDeque<Result<IngestReport>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    uploads: Mutex<Vec<(DocumentUpload, Credential)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_ingest(&self, chunks: u64) {
        self.ingests
            .lock()
            .unwrap()
            .push_back(Ok(IngestReport { chunks }));
    }

    pub fn queue_ingest_failure(&self, status: u16, body: &str) {
        self.ingests
            .lock()
            .unwrap()
            .push_back(Err(CanopyError::api(status, body)));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(DocumentUpload, Credential)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn ingest_document(
        &self,
        upload: &DocumentUpload,
        credential: &Credential,
    ) -> Result<IngestReport> {
        self.uploads
            .lock()
            .unwrap()
            .push((upload.clone(), credential.clone()));
        self.ingests
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(IngestReport { chunks: 1 }))
    }

    async fn send_completion(&self, request: &CompletionRequest) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::text(&["Mock reply"]));

        let (chunks, failure) = match reply {
            Reply::Status(status, body) => return Err(CanopyError::api(status, body)),
            Reply::Chunks(chunks) => (chunks, None),
            Reply::BreakAfter(chunks, error) => (chunks, Some(error)),
        };

        let stream = async_stream::stream! {
            for chunk in chunks {
                yield Ok(chunk);
            }
            if let Some(error) = failure {
                yield Err(CanopyError::Stream(error));
            }
        };
        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".to_string(),
        })
    }
}

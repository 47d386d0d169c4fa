//! Session driver: owns the conversation and performs the effects its
//! transitions ask for.
//!
//! All mutation happens through `&mut self`, so a session is the single
//! writer of its [`ConversationState`]. Replies are drained one chunk at a
//! time; nothing times out unless the backend was configured to, and a turn
//! only ends early if its [`CancellationToken`] fires.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CanopyConfig;
use crate::conversation::{transition, ConversationState, Effect, Event};
use crate::error::{CanopyError, Result};
use crate::stream::StreamReconciler;
use crate::transport::{ChatBackend, HttpBackend};
use crate::types::{CompletionRequest, Credential, DocumentUpload, HealthStatus, IngestReport};

/// Called with the full state after every change.
pub type StateObserver = Arc<dyn Fn(&ConversationState) + Send + Sync>;

/// How a submission ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input, no credential, or a reply already streaming.
    Rejected,
    Completed,
    /// The apology message has been appended; the error is for diagnostics.
    Failed(CanopyError),
    Cancelled,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// How an upload ended.
#[derive(Debug)]
pub enum IngestOutcome {
    /// No credential, or another upload is in flight.
    Rejected,
    Ingested(IngestReport),
    Failed(CanopyError),
}

/// A chat session bound to one backend.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    state: ConversationState,
    observer: Option<StateObserver>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, state: ConversationState) -> Self {
        Self {
            backend,
            state,
            observer: None,
        }
    }

    /// HTTP backend and initial settings taken from `config`.
    pub fn from_config(config: &CanopyConfig) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        Ok(Self::new(
            Arc::new(backend),
            ConversationState::from_config(config),
        ))
    }

    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// End the session, handing back the final state.
    pub fn into_state(self) -> ConversationState {
        self.state
    }

    /// Apply one event and notify the observer.
    pub fn dispatch(&mut self, event: Event) -> Option<Effect> {
        let current = std::mem::take(&mut self.state);
        let next = transition(current, event);
        self.state = next.state;
        if let Some(observer) = &self.observer {
            observer(&self.state);
        }
        next.effect
    }

    pub fn set_credential(&mut self, credential: impl Into<Credential>) {
        self.dispatch(Event::SetCredential(credential.into()));
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.dispatch(Event::SetModel(model.into()));
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.dispatch(Event::SetSystemPrompt(prompt.into()));
    }

    /// Returns whether RAG now has the requested value.
    pub fn set_rag_enabled(&mut self, enabled: bool) -> bool {
        self.dispatch(Event::SetRagEnabled(enabled));
        self.state.rag().is_enabled() == enabled
    }

    pub fn clear_document(&mut self) {
        self.dispatch(Event::ClearDocument);
    }

    pub fn reset(&mut self) {
        self.dispatch(Event::Reset);
    }

    /// Submit `input` and stream the reply to completion.
    pub async fn submit(&mut self, input: &str) -> TurnOutcome {
        self.submit_with_cancel(input, CancellationToken::new()).await
    }

    /// Like [`submit`](Self::submit), abandoning the reply if `cancel` fires.
    pub async fn submit_with_cancel(
        &mut self,
        input: &str,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        self.dispatch(Event::EditInput(input.to_string()));
        match self.dispatch(Event::Submit) {
            Some(Effect::SendCompletion(request)) => self.run_turn(request, cancel).await,
            Some(other) => {
                // Submit only ever yields a completion request.
                warn!(?other, "unexpected effect from submit");
                TurnOutcome::Rejected
            }
            None => TurnOutcome::Rejected,
        }
    }

    async fn run_turn(&mut self, request: CompletionRequest, cancel: CancellationToken) -> TurnOutcome {
        let mut reconciler = StreamReconciler::new();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.backend.send_completion(&request) => Some(opened),
        };
        let mut stream = match opened {
            None => {
                self.dispatch(reconciler.on_cancel().into());
                return TurnOutcome::Cancelled;
            }
            Some(Err(e)) => {
                warn!(error = %e, "completion request failed");
                self.dispatch(reconciler.on_error(e.to_string()).into());
                return TurnOutcome::Failed(e);
            }
            Some(Ok(stream)) => stream,
        };

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(chunks = reconciler.chunks_seen(), "reply cancelled");
                    self.dispatch(reconciler.on_cancel().into());
                    return TurnOutcome::Cancelled;
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        if let Some(event) = reconciler.on_chunk(&chunk) {
                            self.dispatch(event.into());
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, chunks = reconciler.chunks_seen(), "completion stream failed");
                        self.dispatch(reconciler.on_error(e.to_string()).into());
                        return TurnOutcome::Failed(e);
                    }
                    None => {
                        for event in reconciler.on_end() {
                            self.dispatch(event.into());
                        }
                        return TurnOutcome::Completed;
                    }
                },
            }
        }
    }

    /// Upload a document and, on success, switch RAG on.
    pub async fn ingest(&mut self, upload: DocumentUpload) -> IngestOutcome {
        self.ingest_with_cancel(upload, CancellationToken::new()).await
    }

    /// Like [`ingest`](Self::ingest), abandoning the upload if `cancel` fires.
    /// An abandoned upload fails with [`CanopyError::Cancelled`] and leaves any
    /// previously ingested document in place.
    pub async fn ingest_with_cancel(
        &mut self,
        upload: DocumentUpload,
        cancel: CancellationToken,
    ) -> IngestOutcome {
        let Some(Effect::IngestDocument { upload, credential }) =
            self.dispatch(Event::IngestRequested(upload))
        else {
            return IngestOutcome::Rejected;
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CanopyError::Cancelled),
            result = self.backend.ingest_document(&upload, &credential) => result,
        };

        match result {
            Ok(report) => {
                debug!(file_name = %upload.file_name, chunks = report.chunks, "upload accepted");
                self.dispatch(Event::IngestSucceeded(report));
                IngestOutcome::Ingested(report)
            }
            Err(e) => {
                if matches!(e, CanopyError::Cancelled) {
                    info!(file_name = %upload.file_name, "upload cancelled");
                }
                self.dispatch(Event::IngestFailed(e.to_string()));
                IngestOutcome::Failed(e)
            }
        }
    }

    /// Read `path` and [`ingest`](Self::ingest) it under its file name.
    pub async fn ingest_file(&mut self, path: impl AsRef<Path>) -> Result<IngestOutcome> {
        self.ingest_file_with_cancel(path, CancellationToken::new())
            .await
    }

    pub async fn ingest_file_with_cancel(
        &mut self,
        path: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<IngestOutcome> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CanopyError::InvalidArgument(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(self
            .ingest_with_cancel(DocumentUpload::new(file_name, bytes), cancel)
            .await)
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.backend.health_check().await
    }
}

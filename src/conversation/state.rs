//! Conversation state and the mutations transitions are built from.

use strum::Display;
use tracing::debug;

use super::notices;
use crate::config::{CanopyConfig, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::rag::RagContext;
use crate::types::{CompletionRequest, Credential, DocumentUpload, Message};

/// Whether a reply is currently streaming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Per-session knobs that shape each request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub credential: Option<Credential>,
    pub model: String,
    pub system_prompt: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &CanopyConfig) -> Self {
        Self {
            credential: config.credential.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// A usable credential, if one is set.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref().filter(|c| !c.is_blank())
    }
}

/// The single conversation of a session.
///
/// Only [`transition`](super::transition) and the stream reducer mutate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    status: Status,
    reply: Option<usize>,
    rag: RagContext,
    settings: ChatSettings,
    draft: String,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ChatSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn from_config(config: &CanopyConfig) -> Self {
        Self::with_settings(ChatSettings::from_config(config))
    }

    pub fn with_credential(mut self, credential: impl Into<Credential>) -> Self {
        self.settings.credential = Some(credential.into());
        self
    }

    pub fn with_draft(mut self, draft: impl Into<String>) -> Self {
        self.draft = draft.into();
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    pub fn rag(&self) -> &RagContext {
        &self.rag
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// The assistant message the current turn is still writing.
    pub fn in_flight_reply(&self) -> Option<&Message> {
        self.reply.and_then(|i| self.messages.get(i))
    }

    pub(crate) fn settings_mut(&mut self) -> &mut ChatSettings {
        &mut self.settings
    }

    pub(crate) fn rag_mut(&mut self) -> &mut RagContext {
        &mut self.rag
    }

    pub(crate) fn set_draft(&mut self, draft: String) {
        self.draft = draft;
    }

    /// Start a turn from the draft. `None` means the submission is rejected
    /// and nothing changed.
    pub(crate) fn begin_turn(&mut self) -> Option<CompletionRequest> {
        if self.status != Status::Idle {
            debug!("submission rejected: a reply is still streaming");
            return None;
        }
        let input = self.draft.trim();
        if input.is_empty() {
            return None;
        }
        let Some(credential) = self.settings.credential().cloned() else {
            debug!("submission rejected: no credential");
            return None;
        };
        let input = input.to_string();
        self.draft.clear();

        let mut messages = Vec::with_capacity(self.messages.len() + 2);
        messages.push(Message::system(self.settings.system_prompt.clone()));
        messages.extend(self.messages.iter().cloned());
        messages.push(Message::user(input.clone()));

        self.messages.push(Message::user(input));
        self.status = Status::AwaitingResponse;
        self.reply = None;

        Some(CompletionRequest {
            messages,
            model: self.settings.model.clone(),
            credential,
            use_rag: self.rag.is_enabled(),
        })
    }

    /// Append reply text, creating the turn's assistant message on first use.
    pub(crate) fn append_reply(&mut self, text: &str) {
        if let Some(message) = self.reply.and_then(|i| self.messages.get_mut(i)) {
            message.content.push_str(text);
            return;
        }
        self.reply = Some(self.messages.len());
        self.messages.push(Message::assistant(text));
    }

    /// Close the turn, optionally appending a notice after the reply.
    pub(crate) fn finish_turn(&mut self, notice: Option<&str>) {
        if let Some(text) = notice {
            self.messages.push(Message::assistant(text));
        }
        self.status = Status::Idle;
        self.reply = None;
    }

    pub(crate) fn begin_ingest(
        &mut self,
        upload: DocumentUpload,
    ) -> Option<(DocumentUpload, Credential)> {
        let credential = self.settings.credential().cloned()?;
        if !self.rag.begin_ingest(upload.file_name.clone()) {
            debug!(file_name = %upload.file_name, "upload rejected: another is in flight");
            return None;
        }
        Some((upload, credential))
    }

    pub(crate) fn notify(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    pub(crate) fn clear_document(&mut self) {
        if !self.rag.is_ingested() && !self.rag.is_ingesting() {
            return;
        }
        self.rag.clear();
        self.notify(notices::DOCUMENT_CLEARED);
    }

    pub(crate) fn reset(&mut self) {
        if self.status != Status::Idle {
            debug!("reset rejected: a reply is still streaming");
            return;
        }
        self.messages.clear();
        self.reply = None;
    }
}

//! Conversation state machine.
//!
//! State changes go through [`transition`], which consumes the current
//! [`ConversationState`] and an [`Event`] and returns the next state plus at
//! most one [`Effect`] for the caller to perform. Rejected events (blank
//! input, missing credential, a second submission mid-reply) return the
//! state unchanged with no effect.

pub mod notices;
mod state;

#[cfg(test)]
mod proptests;

pub use state::{ChatSettings, ConversationState, Status};

use tracing::warn;

use crate::stream::{self, StreamEvent};
use crate::types::{CompletionRequest, Credential, DocumentUpload, IngestReport};

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetCredential(Credential),
    SetModel(String),
    SetSystemPrompt(String),
    /// Replace the draft input buffer.
    EditInput(String),
    /// Submit the draft as the next user turn.
    Submit,
    Stream(StreamEvent),
    IngestRequested(DocumentUpload),
    IngestSucceeded(IngestReport),
    IngestFailed(String),
    SetRagEnabled(bool),
    /// Forget the uploaded document.
    ClearDocument,
    /// Drop the message history (idle only).
    Reset,
}

impl From<StreamEvent> for Event {
    fn from(event: StreamEvent) -> Self {
        Self::Stream(event)
    }
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SendCompletion(CompletionRequest),
    IngestDocument {
        upload: DocumentUpload,
        credential: Credential,
    },
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ConversationState,
    pub effect: Option<Effect>,
}

/// Apply `event` to `state`.
pub fn transition(mut state: ConversationState, event: Event) -> Transition {
    let effect = match event {
        Event::SetCredential(credential) => {
            state.settings_mut().credential = Some(credential);
            None
        }
        Event::SetModel(model) => {
            state.settings_mut().model = model;
            None
        }
        Event::SetSystemPrompt(prompt) => {
            state.settings_mut().system_prompt = prompt;
            None
        }
        Event::EditInput(text) => {
            state.set_draft(text);
            None
        }
        Event::Submit => state.begin_turn().map(Effect::SendCompletion),
        Event::Stream(event) => {
            return Transition {
                state: stream::reconcile(state, event),
                effect: None,
            };
        }
        Event::IngestRequested(upload) => state
            .begin_ingest(upload)
            .map(|(upload, credential)| Effect::IngestDocument { upload, credential }),
        Event::IngestSucceeded(report) => {
            if let Some(name) = state.rag_mut().complete_ingest() {
                state.notify(notices::document_ingested(&name, report.chunks));
            }
            None
        }
        Event::IngestFailed(error) => {
            if let Some(name) = state.rag_mut().fail_ingest() {
                warn!(file_name = %name, %error, "document upload failed");
                state.notify(notices::UPLOAD_ERROR);
            }
            None
        }
        Event::SetRagEnabled(enabled) => {
            state.rag_mut().set_enabled(enabled);
            None
        }
        Event::ClearDocument => {
            state.clear_document();
            None
        }
        Event::Reset => {
            state.reset();
            None
        }
    };
    Transition { state, effect }
}

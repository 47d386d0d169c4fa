//! Stream reconciliation: folding a streamed reply into the conversation.
//!
//! [`StreamReconciler`] turns raw body chunks into [`StreamEvent`]s and
//! [`reconcile`] applies one event to a [`ConversationState`]. Neither knows
//! about the transport or about rendering.

pub mod decoder;

pub use decoder::Utf8ChunkDecoder;

use tracing::debug;

use crate::conversation::{notices, ConversationState, Status};

/// What happened on the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Newly decoded reply text.
    Fragment(String),
    /// End of data.
    Completed,
    /// Transport failure after the stream was opened (or while opening it).
    Failed(String),
    /// The caller abandoned the turn.
    Cancelled,
}

/// Converts body chunks into stream events for one turn.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    decoder: Utf8ChunkDecoder,
    chunks: usize,
    bytes: usize,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chunk arrived. Yields nothing while it only holds part of a character.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Option<StreamEvent> {
        self.chunks += 1;
        self.bytes += chunk.len();
        let text = self.decoder.decode(chunk);
        (!text.is_empty()).then_some(StreamEvent::Fragment(text))
    }

    /// End of data: flush held-back bytes, then complete.
    pub fn on_end(&mut self) -> Vec<StreamEvent> {
        debug!(chunks = self.chunks, bytes = self.bytes, "completion stream ended");
        let mut events = Vec::with_capacity(2);
        let tail = self.decoder.finish();
        if !tail.is_empty() {
            events.push(StreamEvent::Fragment(tail));
        }
        events.push(StreamEvent::Completed);
        events
    }

    /// Stream failed. A half-received character is not part of the reply.
    pub fn on_error(&mut self, error: impl Into<String>) -> StreamEvent {
        self.decoder.discard();
        StreamEvent::Failed(error.into())
    }

    pub fn on_cancel(&mut self) -> StreamEvent {
        self.decoder.discard();
        StreamEvent::Cancelled
    }

    pub fn chunks_seen(&self) -> usize {
        self.chunks
    }
}

/// Apply one stream event to the conversation.
///
/// Events that arrive while no turn is in flight are ignored.
pub fn reconcile(mut state: ConversationState, event: StreamEvent) -> ConversationState {
    if state.status() != Status::AwaitingResponse {
        debug!(?event, "ignoring stream event outside a turn");
        return state;
    }

    match event {
        StreamEvent::Fragment(text) => state.append_reply(&text),
        StreamEvent::Completed => state.finish_turn(None),
        StreamEvent::Failed(error) => {
            debug!(%error, "completion stream failed");
            state.finish_turn(Some(notices::CHAT_ERROR));
        }
        StreamEvent::Cancelled => state.finish_turn(Some(notices::CANCELLED)),
    }
    state
}

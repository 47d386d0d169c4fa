//! Convenience re-exports for common use.

pub use crate::config::CanopyConfig;
pub use crate::conversation::{transition, ConversationState, Effect, Event, Status};
pub use crate::error::{CanopyError, Result};
pub use crate::rag::RagContext;
pub use crate::session::{ChatSession, IngestOutcome, TurnOutcome};
pub use crate::stream::{StreamEvent, StreamReconciler};
pub use crate::transport::{ChatBackend, HttpBackend};
pub use crate::types::{
    CompletionRequest, Credential, DocumentUpload, IngestReport, Message, ProtocolRevision, Role,
};

//! Completion request and its wire payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{Message, Role};

/// Opaque secret attached to every backend call.
///
/// Surrounding whitespace is stripped on construction. `Debug` never prints
/// the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self(secret.trim().to_string())
    }

    /// The raw secret, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Which request body shape `/api/chat` expects.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProtocolRevision {
    /// `{messages, model, api_key, use_rag}` carrying the full history.
    #[default]
    Messages,
    /// `{developer_message, user_message, model, api_key}`; history and the
    /// RAG flag are not transmitted.
    Flattened,
}

/// A single turn's request, built by the conversation state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub credential: Credential,
    pub use_rag: bool,
}

impl CompletionRequest {
    /// Serializable body for the given protocol revision.
    pub fn payload(&self, revision: ProtocolRevision) -> ChatPayload<'_> {
        match revision {
            ProtocolRevision::Messages => ChatPayload::Messages {
                messages: &self.messages,
                model: &self.model,
                api_key: self.credential.expose(),
                use_rag: self.use_rag,
            },
            ProtocolRevision::Flattened => ChatPayload::Flattened {
                developer_message: self.last_content(Role::System),
                user_message: self.last_content(Role::User),
                model: &self.model,
                api_key: self.credential.expose(),
            },
        }
    }

    fn last_content(&self, role: Role) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// JSON body of `POST /api/chat`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatPayload<'a> {
    Messages {
        messages: &'a [Message],
        model: &'a str,
        api_key: &'a str,
        use_rag: bool,
    },
    Flattened {
        developer_message: &'a str,
        user_message: &'a str,
        model: &'a str,
        api_key: &'a str,
    },
}

/// A document handed to the ingestion endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Successful ingestion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks: u64,
}

/// Backend health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

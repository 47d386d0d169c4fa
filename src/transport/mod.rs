//! Backend transport: the trait the session drives and its HTTP implementation.

pub mod http;
mod multipart;

pub use http::HttpBackend;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{CompletionRequest, Credential, DocumentUpload, HealthStatus, IngestReport};

/// Raw body chunks of a streamed completion, in delivery order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Operations the chat backend exposes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Upload a document for retrieval. Failure statuses carry the response body.
    async fn ingest_document(
        &self,
        upload: &DocumentUpload,
        credential: &Credential,
    ) -> Result<IngestReport>;

    /// Open a completion stream. The request body is fully serialized before
    /// sending; a non-2xx status fails before any chunk is yielded.
    async fn send_completion(&self, request: &CompletionRequest) -> Result<ByteStream>;

    async fn health_check(&self) -> Result<HealthStatus>;
}

//! HTTP backend speaking the `/api/*` protocol.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::RequestBuilder;
use tracing::{debug, warn};
use uuid::Uuid;

use super::multipart::build_upload_multipart;
use super::{ByteStream, ChatBackend};
use crate::config::CanopyConfig;
use crate::error::{CanopyError, Result};
use crate::types::{
    CompletionRequest, Credential, DocumentUpload, HealthStatus, IngestReport, ProtocolRevision,
};

/// `ChatBackend` over HTTP.
///
/// No client-side timeout is applied unless the config sets one.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    protocol: ProtocolRevision,
    request_timeout: Option<Duration>,
}

impl HttpBackend {
    pub fn new(config: &CanopyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-provided client (shared pools, custom TLS, proxies).
    pub fn with_client(client: reqwest::Client, config: &CanopyConfig) -> Self {
        Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            protocol: config.protocol,
            request_timeout: config.request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn protocol(&self) -> ProtocolRevision {
        self.protocol
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let builder = match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        builder.send().await.map_err(|e| self.map_reqwest_error(e))
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> CanopyError {
        match self.request_timeout {
            Some(timeout) if error.is_timeout() => CanopyError::Timeout(timeout.as_millis() as u64),
            _ => CanopyError::Network(error),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ingest_document(
        &self,
        upload: &DocumentUpload,
        credential: &Credential,
    ) -> Result<IngestReport> {
        let boundary = format!("canopy-{}", Uuid::new_v4().simple());
        let body = build_upload_multipart(
            &boundary,
            &upload.file_name,
            &upload.bytes,
            credential.expose(),
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}")).map_err(
                |e| {
                    CanopyError::InvalidArgument(format!(
                        "Failed to build multipart content-type: {e}"
                    ))
                },
            )?,
        );

        debug!(
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "uploading document"
        );

        let resp = self
            .send(
                self.client
                    .post(self.endpoint("/api/upload-pdf"))
                    .headers(headers)
                    .body(body),
            )
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "document upload rejected");
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let text = resp.text().await.map_err(|e| self.map_reqwest_error(e))?;
        let report: IngestReport = serde_json::from_str(&text)?;
        debug!(chunks = report.chunks, "document ingested");
        Ok(report)
    }

    async fn send_completion(&self, request: &CompletionRequest) -> Result<ByteStream> {
        let body = serde_json::to_vec(&request.payload(self.protocol))?;

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            use_rag = request.use_rag,
            protocol = %self.protocol,
            "opening completion stream"
        );

        let resp = self
            .send(
                self.client
                    .post(self.endpoint("/api/chat"))
                    .headers(json_headers())
                    .body(body),
            )
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body_text, "completion request failed");
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let timeout = self.request_timeout;
        let stream = resp.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => match timeout {
                Some(t) if e.is_timeout() => Err(CanopyError::Timeout(t.as_millis() as u64)),
                _ => Err(CanopyError::Stream(e.to_string())),
            },
        });

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        let resp = self.send(self.client.get(self.endpoint("/api/health"))).await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let text = resp.text().await.map_err(|e| self.map_reqwest_error(e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Headers for JSON request bodies.
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Convert a non-2xx response into an error, keeping the body text.
///
/// The relay in front of the backend wraps failures as `{"error": "..."}`;
/// that envelope is unwrapped so the message is the backend's own text.
pub fn status_to_error(status: u16, body: &str) -> CanopyError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    CanopyError::api(status, message)
}

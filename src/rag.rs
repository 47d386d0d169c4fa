//! Document-grounded (RAG) mode bookkeeping.
//!
//! `enabled` can only be true while a document is ingested; every mutator
//! preserves that.

/// What the client knows about the uploaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RagContext {
    document_name: Option<String>,
    ingested: bool,
    enabled: bool,
    pending: Option<String>,
}

impl RagContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    pub fn is_ingested(&self) -> bool {
        self.ingested
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Name of the document whose upload is in flight.
    pub fn pending_document(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_ingesting(&self) -> bool {
        self.pending.is_some()
    }

    /// Record that an upload started. Refused while another is in flight.
    pub fn begin_ingest(&mut self, document_name: impl Into<String>) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(document_name.into());
        true
    }

    /// The in-flight upload succeeded: the document replaces any previous
    /// one and RAG is switched on. Returns the document name, or `None` if
    /// no upload was in flight.
    pub fn complete_ingest(&mut self) -> Option<String> {
        let name = self.pending.take()?;
        self.document_name = Some(name.clone());
        self.ingested = true;
        self.enabled = true;
        Some(name)
    }

    /// The in-flight upload failed; the previous document (if any) stays.
    pub fn fail_ingest(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Toggle RAG. Enabling without an ingested document is refused.
    /// Returns whether the flag now has the requested value.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if enabled && !self.ingested {
            return false;
        }
        self.enabled = enabled;
        true
    }

    /// Forget the document, including any upload still in flight.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

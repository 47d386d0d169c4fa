//! Fixed assistant-side texts the client inserts into the conversation.

pub const CHAT_ERROR: &str = "Sorry, there was an error processing your request.";
pub const UPLOAD_ERROR: &str = "Sorry, there was an error uploading your PDF.";
pub const CANCELLED: &str = "Response cancelled.";
pub const DOCUMENT_CLEARED: &str =
    "🌲 PDF context has been cleared. I will no longer use it for answering questions.";

pub fn document_ingested(document_name: &str, chunks: u64) -> String {
    format!(
        "🌲 I've processed your PDF \"{document_name}\" successfully! I found {chunks} sections \
         to learn from. You can now ask me questions about it."
    )
}

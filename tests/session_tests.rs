//! End-to-end turns through `ChatSession` against a scripted backend.

mod common;

use std::sync::Arc;

use common::{Reply, ScriptedBackend};
use pretty_assertions::assert_eq;

use canopy::conversation::{notices, ConversationState, Status};
use canopy::session::{ChatSession, IngestOutcome, TurnOutcome};
use canopy::types::*;

fn session_with(backend: &Arc<ScriptedBackend>) -> ChatSession {
    ChatSession::new(
        backend.clone(),
        ConversationState::new().with_credential("k1"),
    )
}

#[tokio::test]
async fn submit_sends_history_and_awaits_reply() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut session = session_with(&backend);

    let outcome = session.submit("Hello").await;

    assert!(outcome.is_completed());
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-3.5-turbo");
    assert_eq!(requests[0].credential.expose(), "k1");
    assert_eq!(requests[0].messages.last(), Some(&Message::user("Hello")));
    assert_eq!(session.state().messages()[0], Message::user("Hello"));
}

#[tokio::test]
async fn streamed_chunks_form_one_reply() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_reply(Reply::text(&["The ", "answer is ", "42."]));
    let mut session = session_with(&backend);

    session.submit("What is the answer?").await;

    assert_eq!(
        session.state().messages(),
        &[
            Message::user("What is the answer?"),
            Message::assistant("The answer is 42."),
        ]
    );
    assert_eq!(session.state().status(), Status::Idle);
}

#[tokio::test]
async fn multibyte_character_split_across_chunks() {
    let backend = Arc::new(ScriptedBackend::new());
    let bytes = "Grüße 🌲".as_bytes().to_vec();
    backend.queue_reply(Reply::Chunks(vec![
        bytes[..3].to_vec(),
        bytes[3..9].to_vec(),
        bytes[9..].to_vec(),
    ]));
    let mut session = session_with(&backend);

    session.submit("Greet me").await;

    assert_eq!(session.state().messages()[1].content, "Grüße 🌲");
}

#[tokio::test]
async fn upload_enables_rag_for_following_turns() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_ingest(7);
    let mut session = session_with(&backend);

    let outcome = session
        .ingest(DocumentUpload::new("notes.pdf", b"%PDF-1.7".to_vec()))
        .await;

    assert!(matches!(outcome, IngestOutcome::Ingested(IngestReport { chunks: 7 })));
    assert!(session.state().rag().is_ingested());
    assert!(session.state().rag().is_enabled());
    let notice = session.state().messages()[0].clone();
    assert_eq!(notice.role, Role::Assistant);
    assert!(notice.content.contains("notes.pdf"));
    assert!(notice.content.contains("7 sections"));

    let uploads = backend.uploads();
    assert_eq!(uploads[0].0.file_name, "notes.pdf");
    assert_eq!(uploads[0].1.expose(), "k1");

    session.submit("What does it say?").await;
    let request = backend.requests().pop().unwrap();
    assert!(request.use_rag);
    // the upload notice is part of the history sent back
    assert_eq!(request.messages[1].content, notice.content);
}

#[tokio::test]
async fn empty_submission_sends_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut session = session_with(&backend);

    let outcome = session.submit("   ").await;

    assert!(matches!(outcome, TurnOutcome::Rejected));
    assert!(session.state().messages().is_empty());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn missing_credential_sends_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut session = ChatSession::new(backend.clone(), ConversationState::new());

    assert!(matches!(session.submit("Hello").await, TurnOutcome::Rejected));
    assert!(backend.requests().is_empty());
    assert!(matches!(
        session.ingest(DocumentUpload::new("a.pdf", vec![])).await,
        IngestOutcome::Rejected
    ));
    assert!(backend.uploads().is_empty());
}

#[tokio::test]
async fn server_error_becomes_apology_message() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_reply(Reply::text(&["Fine."]));
    backend.queue_reply(Reply::Status(500, "quota exceeded".into()));
    let mut session = session_with(&backend);

    session.submit("First").await;
    let before = session.state().messages().to_vec();
    let outcome = session.submit("Second").await;

    match outcome {
        TurnOutcome::Failed(e) => {
            assert_eq!(e.status(), Some(500));
            assert!(e.to_string().contains("quota exceeded"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let messages = session.state().messages();
    assert_eq!(&messages[..before.len()], before.as_slice());
    assert_eq!(
        &messages[before.len()..],
        &[Message::user("Second"), Message::assistant(notices::CHAT_ERROR)]
    );
    assert!(session.state().is_idle());

    // the session stays usable
    assert!(session.submit("Third").await.is_completed());
}

#[tokio::test]
async fn stream_break_keeps_partial_reply() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_reply(Reply::BreakAfter(
        vec![b"Once upon ".to_vec(), b"a time".to_vec()],
        "connection reset".into(),
    ));
    let mut session = session_with(&backend);

    let outcome = session.submit("Tell me a story").await;

    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert_eq!(
        session.state().messages(),
        &[
            Message::user("Tell me a story"),
            Message::assistant("Once upon a time"),
            Message::assistant(notices::CHAT_ERROR),
        ]
    );
    assert!(session.state().is_idle());
}

#[tokio::test]
async fn clearing_document_after_rag_turns() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_ingest(3);
    let mut session = session_with(&backend);
    session
        .ingest(DocumentUpload::new("notes.pdf", vec![]))
        .await;
    session.submit("Summarize").await;
    let before = session.state().messages().to_vec();

    session.clear_document();

    let rag = session.state().rag();
    assert!(!rag.is_ingested());
    assert!(!rag.is_enabled());
    let messages = session.state().messages();
    assert_eq!(messages.len(), before.len() + 1);
    assert_eq!(&messages[..before.len()], before.as_slice());
    assert_eq!(messages.last(), Some(&Message::assistant(notices::DOCUMENT_CLEARED)));

    session.submit("And now?").await;
    assert!(!backend.requests().pop().unwrap().use_rag);
}

#[tokio::test]
async fn failed_upload_leaves_rag_off() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_ingest_failure(422, "not a PDF");
    let mut session = session_with(&backend);

    let outcome = session.ingest(DocumentUpload::new("notes.txt", vec![])).await;

    assert!(matches!(outcome, IngestOutcome::Failed(_)));
    assert!(!session.state().rag().is_ingested());
    assert!(!session.set_rag_enabled(true));
    assert_eq!(
        session.state().messages(),
        &[Message::assistant(notices::UPLOAD_ERROR)]
    );
}

#[tokio::test]
async fn rag_toggle_round_trip_and_reingest() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.queue_ingest(2);
    backend.queue_ingest(5);
    let mut session = session_with(&backend);

    session.ingest(DocumentUpload::new("a.pdf", vec![])).await;
    assert!(session.set_rag_enabled(false));
    session.submit("q1").await;
    session.clear_document();
    assert!(!session.set_rag_enabled(true));
    session.ingest(DocumentUpload::new("b.pdf", vec![])).await;
    session.submit("q2").await;

    let flags: Vec<bool> = backend.requests().iter().map(|r| r.use_rag).collect();
    assert_eq!(flags, vec![false, true]);
    assert_eq!(session.state().rag().document_name(), Some("b.pdf"));
}

#[tokio::test]
async fn ingest_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF-1.4 body").unwrap();

    let backend = Arc::new(ScriptedBackend::new());
    let mut session = session_with(&backend);
    let outcome = session.ingest_file(&path).await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Ingested(_)));
    let (upload, _) = backend.uploads().remove(0);
    assert_eq!(upload.file_name, "report.pdf");
    assert_eq!(upload.bytes, b"%PDF-1.4 body");
}

//! canopy: streaming chat client with document-grounded (RAG) mode
//!
//! Talks to a chat backend exposing `/api/chat` (streamed completions) and
//! `/api/upload-pdf` (document ingestion). A [`ChatSession`](session::ChatSession)
//! owns the conversation, drives the pure
//! [`transition`](conversation::transition) state machine and folds each
//! streamed reply into a single assistant message.
//!
//! # Quick Start
//!
//! ```no_run
//! use canopy::prelude::*;
//!
//! # async fn example() -> canopy::error::Result<()> {
//! let config = CanopyConfig::from_env()?;
//! let mut session = ChatSession::from_config(&config)?;
//! session.set_credential("sk-...");
//! session.submit("Hello!").await;
//! if let Some(reply) = session.state().messages().last() {
//!     println!("{}", reply.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod prelude;
pub mod rag;
pub mod session;
pub mod stream;
pub mod transport;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

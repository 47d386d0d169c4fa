//! `canopy chat` and `canopy health` handlers.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::ChatArgs;
use crate::config::CanopyConfig;
use crate::conversation::ConversationState;
use crate::error::{CanopyError, Result};
use crate::session::{ChatSession, IngestOutcome, TurnOutcome};
use crate::types::Role;

const HELP: &str = "\
Commands:
  /upload <path>   upload a PDF and answer from it
  /rag on|off      use or ignore the uploaded PDF
  /clear           forget the uploaded PDF
  /reset           start a new conversation
  /model <id>      switch model
  /help            show this help
  /quit            exit
Ctrl-C stops the reply or upload in progress; at the prompt it exits.";

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Say(String),
    Upload(PathBuf),
    Rag(bool),
    Clear,
    Reset,
    Model(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(ReplCommand::Say(line.to_string()));
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    Some(match (name, arg) {
        ("upload", path) if !path.is_empty() => ReplCommand::Upload(PathBuf::from(path)),
        ("rag", "on") => ReplCommand::Rag(true),
        ("rag", "off") => ReplCommand::Rag(false),
        ("clear", "") => ReplCommand::Clear,
        ("reset", "") => ReplCommand::Reset,
        ("model", model) if !model.is_empty() => ReplCommand::Model(model.to_string()),
        ("help", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    })
}

/// Writes assistant output as it appears, including the streamed tail.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    shown: usize,
    partial: usize,
}

impl TranscriptPrinter {
    pub fn render(&mut self, state: &ConversationState, out: &mut impl Write) -> std::io::Result<()> {
        let messages = state.messages();
        if messages.len() < self.shown {
            self.shown = messages.len();
            self.partial = 0;
        }
        let streaming = state.in_flight_reply();

        for message in &messages[self.shown..] {
            if message.role == Role::User {
                self.shown += 1;
                self.partial = 0;
                continue;
            }
            out.write_all(message.content.get(self.partial..).unwrap_or_default().as_bytes())?;
            if streaming.is_some_and(|reply| std::ptr::eq(reply, message)) {
                self.partial = message.content.len();
                break;
            }
            out.write_all(b"\n")?;
            self.shown += 1;
            self.partial = 0;
        }
        out.flush()
    }
}

/// Routes Ctrl-C to whatever is running; with nothing running it exits.
///
/// One listener serves the whole command. Once tokio has taken over SIGINT
/// the default handler is gone, so the idle case has to exit by hand.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Start listening for Ctrl-C for the rest of the process.
    pub fn install() -> Self {
        let interrupts = Self::default();
        let listener = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.interrupt() {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        });
        interrupts
    }

    /// Token for the next operation. Ctrl-C cancels it until [`finish`](Self::finish).
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            *active = Some(token.clone());
        }
        token
    }

    pub fn finish(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
    }

    /// Cancel the running operation. Returns `false` if nothing was running.
    pub fn interrupt(&self) -> bool {
        let active = self.active.lock().ok().and_then(|active| active.clone());
        match active {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Handle `canopy chat`.
pub async fn handle_chat(config: CanopyConfig, args: ChatArgs) -> Result<()> {
    if !config.has_credential() {
        return Err(CanopyError::Configuration(
            "No API key: pass --api-key or set CANOPY_API_KEY".into(),
        ));
    }

    let printer = Arc::new(Mutex::new(TranscriptPrinter::default()));
    let sink = printer.clone();
    let mut session = ChatSession::from_config(&config)?.with_observer(Arc::new(
        move |state: &ConversationState| {
            if let Ok(mut printer) = sink.lock() {
                let _ = printer.render(state, &mut std::io::stdout());
            }
        },
    ));

    let interrupts = Interrupts::install();

    if let Some(path) = args.document {
        upload(&mut session, &interrupts, path).await?;
    }

    if let Some(prompt) = args.prompt {
        return match run_turn(&mut session, &interrupts, &prompt).await {
            TurnOutcome::Failed(e) => Err(e),
            _ => Ok(()),
        };
    }

    eprintln!("model {}; /help for commands", config.model);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match command {
            ReplCommand::Say(text) => {
                run_turn(&mut session, &interrupts, &text).await;
            }
            ReplCommand::Upload(path) => {
                if let Err(e) = upload(&mut session, &interrupts, path).await {
                    eprintln!("{e}");
                }
            }
            ReplCommand::Rag(enabled) => {
                if !session.set_rag_enabled(enabled) {
                    eprintln!("Upload a PDF first");
                }
            }
            ReplCommand::Clear => session.clear_document(),
            ReplCommand::Reset => session.reset(),
            ReplCommand::Model(model) => session.set_model(model),
            ReplCommand::Help => eprintln!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(line) => eprintln!("Unknown command: {line} (try /help)"),
        }
    }
    Ok(())
}

async fn run_turn(session: &mut ChatSession, interrupts: &Interrupts, text: &str) -> TurnOutcome {
    let outcome = session.submit_with_cancel(text, interrupts.begin()).await;
    interrupts.finish();
    outcome
}

async fn upload(session: &mut ChatSession, interrupts: &Interrupts, path: PathBuf) -> Result<()> {
    let outcome = session
        .ingest_file_with_cancel(&path, interrupts.begin())
        .await;
    interrupts.finish();
    match outcome? {
        IngestOutcome::Ingested(_) | IngestOutcome::Failed(_) => Ok(()),
        IngestOutcome::Rejected => Err(CanopyError::InvalidArgument(format!(
            "cannot upload {} while another upload is running",
            path.display()
        ))),
    }
}

/// Handle `canopy health`.
pub async fn handle_health(config: CanopyConfig) -> Result<()> {
    let session = ChatSession::from_config(&config)?;
    let health = session.health_check().await?;
    println!("{}: {}", config.backend_url, health.status);
    if health.is_ok() {
        Ok(())
    } else {
        Err(CanopyError::Unhealthy(format!("backend reported '{}'", health.status)))
    }
}

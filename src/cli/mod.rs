//! CLI entry point for canopy.

pub mod chat;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::CanopyConfig;
use crate::error::Result;
use crate::types::ProtocolRevision;

/// canopy chat client
#[derive(Parser, Debug)]
#[command(name = "canopy", version, about = "canopy: streaming chat client with PDF-grounded answers")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the backend (interactive unless a prompt is given)
    Chat(ChatArgs),
    /// Check that the backend is reachable
    Health,
}

/// Options shared by every subcommand; they override file and env config.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (e.g. http://localhost:8000)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Chat payload shape: messages or flattened
    #[arg(long, global = true)]
    pub protocol: Option<ProtocolRevision>,

    /// API key sent with every request
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: none)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Arguments for the `chat` subcommand.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model identifier (e.g. gpt-3.5-turbo, gpt-4)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Upload this document before chatting and answer from it
    #[arg(short, long)]
    pub document: Option<PathBuf>,

    /// Single prompt; exits after the reply
    pub prompt: Option<String>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Layer command-line flags over file and environment config.
    pub fn resolve_config(&self) -> Result<CanopyConfig> {
        let mut config = CanopyConfig::load(self.global.config.as_deref())?;
        apply_global_args(&mut config, &self.global);
        if let Commands::Chat(args) = &self.command {
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            if let Some(system) = &args.system {
                config.system_prompt = system.clone();
            }
        }
        Ok(config)
    }
}

fn apply_global_args(config: &mut CanopyConfig, args: &GlobalArgs) {
    if let Some(url) = &args.backend {
        config.backend_url = url.clone();
    }
    if let Some(protocol) = args.protocol {
        config.protocol = protocol;
    }
    if let Some(key) = &args.api_key {
        config.set_credential(key.clone());
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Some(Duration::from_secs(secs));
    }
}

//! Configuration system (layered: defaults < file < env < code).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CanopyError, Result};
use crate::types::{Credential, ProtocolRevision};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Client configuration.
///
/// There is deliberately no request timeout unless one is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct CanopyConfig {
    pub backend_url: String,
    pub protocol: ProtocolRevision,
    pub model: String,
    pub system_prompt: String,
    pub credential: Option<Credential>,
    pub request_timeout: Option<Duration>,
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            protocol: ProtocolRevision::default(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            credential: None,
            request_timeout: None,
        }
    }
}

/// On-disk TOML shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    backend_url: Option<String>,
    protocol: Option<ProtocolRevision>,
    model: Option<String>,
    system_prompt: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl CanopyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env()?;
        Ok(config)
    }

    /// Optional TOML file, then `.env` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        let _ = dotenvy::dotenv();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::new();
        if let Some(url) = file.backend_url {
            config.backend_url = url;
        }
        if let Some(protocol) = file.protocol {
            config.protocol = protocol;
        }
        if let Some(model) = file.model {
            config.model = model;
        }
        if let Some(prompt) = file.system_prompt {
            config.system_prompt = prompt;
        }
        if let Some(key) = file.api_key {
            config.set_credential(key);
        }
        if let Some(secs) = file.timeout_secs {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = var("CANOPY_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(protocol) = var("CANOPY_PROTOCOL") {
            self.protocol = protocol.parse().map_err(|_| {
                CanopyError::Configuration(format!(
                    "CANOPY_PROTOCOL must be 'messages' or 'flattened', got '{protocol}'"
                ))
            })?;
        }
        if let Some(model) = var("CANOPY_MODEL") {
            self.model = model;
        }
        if let Some(prompt) = var("CANOPY_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(key) = var("CANOPY_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.set_credential(key);
        }
        if let Some(secs) = var("CANOPY_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CanopyError::Configuration(format!("CANOPY_TIMEOUT_SECS is not a number: '{secs}'"))
            })?;
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(())
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolRevision) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Blank keys are treated as absent.
    pub fn set_credential(&mut self, key: impl Into<String>) {
        let credential = Credential::new(key);
        self.credential = (!credential.is_blank()).then_some(credential);
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

//! Error types for canopy.

pub mod category;

pub use category::ErrorCategory;

use thiserror::Error;

/// Primary error type for all canopy operations.
#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Backend unhealthy: {0}")]
    Unhealthy(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CanopyError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { .. } | Self::Network(_) | Self::Timeout(_) | Self::Unhealthy(_) => {
                ErrorCategory::Transport
            }
            Self::Stream(_) => ErrorCategory::Stream,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Configuration(_) | Self::ConfigFile(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidArgument(_) => ErrorCategory::Validation,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether resubmitting the same request could plausibly succeed.
    ///
    /// Nothing in canopy retries automatically; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Network(_) | Self::Timeout(_) | Self::Stream(_) => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CanopyError>;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BinderError {
    /// Unknown region label, missing credential, or an invalid run parameter.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Input structure not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to fetch structure from {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Non-200 response from an inference service. Never retried.
    #[error("Service error from {stage} [{status}]: {body}")]
    Service {
        stage: String,
        status: u16,
        body: String,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl BinderError {
    /// True for errors raised before any service was contacted.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            BinderError::Config(_) | BinderError::Precondition(_) | BinderError::InputNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BinderError>;

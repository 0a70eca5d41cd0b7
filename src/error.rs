//! Settings store errors

use std::path::PathBuf;
use thiserror::Error;

/// Settings store result type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised by the settings store.
///
/// Load failures are fatal: there is no fallback document, so callers are
/// expected to abort startup with the message (it names the resolved path).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {} has an invalid layout: {reason}", path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("failed to persist settings to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid settings path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("unknown settings category: {0}")]
    UnknownCategory(String),
}

impl ConfigError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

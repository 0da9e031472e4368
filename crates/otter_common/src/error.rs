//! Error types for the bundle engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decompress {}: {reason}", archive.display())]
    Decompress { archive: PathBuf, reason: String },

    #[error("Cannot unflatten {} into {}: {source}", from.display(), to.display())]
    Unflatten {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdaterError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdaterError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable tag, used by the CLI and in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdaterError::Storage { .. } => "storage",
            UpdaterError::Decompress { .. } => "decompress",
            UpdaterError::Unflatten { .. } => "unflatten",
            UpdaterError::Network(_) => "network",
            UpdaterError::Config(_) => "config",
            UpdaterError::Io(_) => "io",
            UpdaterError::Json(_) => "json",
        }
    }
}

impl From<reqwest::Error> for UpdaterError {
    fn from(e: reqwest::Error) -> Self {
        UpdaterError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;

//! Error type shared by the taglog crates

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TaglogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaglogError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Path involved in the failure, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::FileRead { path, .. }
            | Self::FileWrite { path, .. }
            | Self::FileOpen { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias using TaglogError
pub type Result<T> = std::result::Result<T, TaglogError>;

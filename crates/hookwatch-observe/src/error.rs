//! Error types for the execution log pipeline
//!
//! Nothing in this crate lets these errors reach a hook's decision. They are
//! returned so that best-effort call sites discard them explicitly.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline operation errors
#[derive(Debug, Error)]
pub enum ObserveError {
    /// A log or context directory could not be created
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory being created
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Appending or writing a file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A file or directory was missing or unreadable
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A record could not be parsed
    #[error("Malformed record in {path}: {message}")]
    Parse {
        /// File containing the record
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// A record could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Compressing a rotated log failed; any partial output was removed
    #[error("Failed to compress {path}: {message}")]
    Compression {
        /// Rotated log being compressed
        path: PathBuf,
        /// Failure description
        message: String,
    },

    /// Deleting an expired context record failed
    #[error("Failed to prune {path}: {source}")]
    Prune {
        /// Context record being removed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Session id is empty or reduces to a path traversal component
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),
}

/// Specialized Result type for pipeline operations
pub type ObserveResult<T> = Result<T, ObserveError>;

impl ObserveError {
    pub(crate) fn dir_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the error is a missing file rather than a real failure
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Read { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

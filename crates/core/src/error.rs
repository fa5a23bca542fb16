use std::path::PathBuf;

use thiserror::Error;

/// Which form of path an operation expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathKind {
    #[error("absolute")]
    Absolute,
    #[error("relative")]
    Relative,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("expected {expected} path, got {}", .path.display())]
    InvalidPathKind { path: PathBuf, expected: PathKind },

    #[error("path does not name a file: {:?}", .0)]
    EmptyKey(PathBuf),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("transfer failed for {key}: {detail}")]
    Transfer { key: String, detail: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

//! Error types for fbr_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using fbr_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error category, for callers that only care about the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file that had to be read does not exist.
    NotFound,
    /// Open, read, write or flush failure.
    Io,
    /// Invalid caller-supplied parameters.
    Config,
}

/// Errors that can occur while hashing, copying or rotating.
#[derive(Error, Debug)]
pub enum Error {
    /// The file to read does not exist.
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// I/O error on a specific file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backup chain needs at least one slot.
    #[error("Invalid max count: {count} (must be at least 1)")]
    InvalidMaxCount { count: usize },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },
}

impl Error {
    /// Wrap an `io::Error` for `path`, mapping `NotFound` to [`Error::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound { path }
        } else {
            Error::Io { path, source }
        }
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Create an InvalidMaxCount error.
    pub fn invalid_max_count(count: usize) -> Self {
        Error::InvalidMaxCount { count }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Io { .. } => ErrorKind::Io,
            Error::InvalidMaxCount { .. }
            | Error::UnsupportedAlgorithm { .. }
            | Error::InvalidHash { .. } => ErrorKind::Config,
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        let path = err.file.path().to_path_buf();
        Error::Io {
            path,
            source: err.error,
        }
    }
}

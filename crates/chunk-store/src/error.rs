//! Error types for the chunk store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing store files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure. Never retried inside the store.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header could not be parsed, or the file is truncated.
    #[error("invalid chunk file header in {path}: {message}")]
    InvalidHeader { path: PathBuf, message: String },

    /// Stored shape is not a 2-D, 3-D or 4-D layout this reader understands.
    #[error("unsupported layout with shape {shape:?}")]
    UnsupportedLayout { shape: Vec<u64> },

    /// Compressed block failed to decode.
    #[error("corrupt block {block} in {path}: {message}")]
    CorruptBlock {
        path: PathBuf,
        block: usize,
        message: String,
    },

    /// Caller violated a request contract, e.g. several levels and several
    /// locations in one read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another writer holds the temp file for this unit.
    #[error("store file {0} is locked by another writer")]
    Locked(PathBuf),

    /// Supplied data does not match the expected shape.
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from an upstream data supplier during update.
    #[error("data supplier failed: {0}")]
    Supplier(String),
}

impl StoreError {
    /// Create an Io error tied to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an InvalidHeader error.
    pub fn invalid_header(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidRequest error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a Supplier error.
    pub fn supplier(msg: impl Into<String>) -> Self {
        Self::Supplier(msg.into())
    }

    /// True when the error is a missing file, which readers treat as an
    /// absent tier rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type for chunk store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

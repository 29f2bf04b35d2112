//! Error types for readers and the mixer.

use chunk_store::StoreError;
use temporal::TemporalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("temporal processing error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("location {location} outside domain {domain} with {count} locations")]
    LocationOutOfRange {
        domain: String,
        location: usize,
        count: usize,
    },

    #[error("no readers to mix")]
    NoReaders,

    #[error("reader {reader} returned {actual} values, expected {expected}")]
    LengthMismatch {
        reader: String,
        expected: usize,
        actual: usize,
    },

    #[error("blocking read task failed: {0}")]
    Join(String),
}

impl ReaderError {
    pub fn join(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

//! Error types for temporal processing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemporalError {
    /// Series length does not match its time range.
    #[error("series has {actual} values but the time range has {expected} steps")]
    LengthMismatch { expected: usize, actual: usize },

    /// Solar interpolation was requested without a solar factor source.
    #[error("solar interpolation requires a solar factor")]
    MissingSolarFactor,

    /// Window parameters for deaveraging/deaccumulation are unusable.
    #[error("invalid window: {0}")]
    InvalidWindow(String),
}

impl TemporalError {
    pub fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::LengthMismatch { expected, actual })
        }
    }
}

pub type Result<T> = std::result::Result<T, TemporalError>;

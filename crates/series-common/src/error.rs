//! Error types shared by the time-series crates.

use thiserror::Error;

/// Result type alias using [`SeriesError`].
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Errors raised while parsing times or loading domain/variable configuration.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid configuration for '{name}': {message}")]
    InvalidConfig { name: String, message: String },

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SeriesError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            message: message.into(),
        }
    }
}

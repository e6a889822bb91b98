//! Error handling module for phrasecut

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for phrasecut operations
#[derive(Error, Debug)]
pub enum PhraseCutError {
    /// Failure reported by the media core
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Environment or command-line override that does not parse
    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },

    /// Invalid time argument
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON input or output error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for phrasecut operations
pub type PhraseCutResult<T> = std::result::Result<T, PhraseCutError>;

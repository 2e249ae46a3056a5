use thiserror::Error;

/// Top-level error type for the Sakhi client.
///
/// Covers failures of the application shell (configuration, files, encoding).
/// Conversation and playback failures have their own error types in
/// `sakhi-chat` and `sakhi-audio` and never escape those crates as faults.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SakhiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SakhiError {
    fn from(err: toml::de::Error) -> Self {
        SakhiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SakhiError {
    fn from(err: toml::ser::Error) -> Self {
        SakhiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SakhiError {
    fn from(err: serde_json::Error) -> Self {
        SakhiError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sakhi operations.
pub type Result<T> = std::result::Result<T, SakhiError>;

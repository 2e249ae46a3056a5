//! Error types for the conversation core.

use sakhi_core::error::SakhiError;

/// Failure of a chat round trip.
///
/// The controller never propagates these; a failed turn is replaced by the
/// configured apology entry.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned status {status}")]
    Status { status: u16 },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<TransportError> for SakhiError {
    fn from(err: TransportError) -> Self {
        SakhiError::Transport(err.to_string())
    }
}

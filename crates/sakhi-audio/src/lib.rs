//! Sakhi Audio crate - read-aloud of assistant replies.
//!
//! Provides trait-based abstractions for speech synthesis and audio output,
//! the single-stream playback controller built on them, a process-backed
//! output that hands audio to an external player, and mock implementations
//! for testing without a speech service or sound hardware.

pub mod mock;
pub mod playback;
pub mod process;

use std::future::Future;

use tokio::sync::oneshot;

use sakhi_core::error::SakhiError;

pub use mock::{MockAudioOutput, MockSpeechSynthesizer, MockStream};
pub use playback::{PlaybackController, PlaybackHandle};
pub use process::{ProcessAudioOutput, ProcessStream};

// =============================================================================
// Errors
// =============================================================================

/// Failure while producing or playing synthesized speech.
///
/// Never surfaced to the user; the playback controller logs and drops it.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("audio output failed: {0}")]
    Output(String),
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for SakhiError {
    fn from(err: AudioError) -> Self {
        SakhiError::Audio(err.to_string())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Text-to-speech capability.
pub trait SpeechSynthesizer: Send + Sync {
    /// Produce playable audio bytes for `text`.
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>, AudioError>> + Send;
}

/// A started audio stream.
pub trait AudioStream: Send {
    /// Halt output. Calling it again is a no-op.
    fn stop(&mut self);
}

/// A stream that has started, plus a signal that fires when it ends on its
/// own or after being stopped.
pub struct Playing<S> {
    pub stream: S,
    pub finished: oneshot::Receiver<()>,
}

/// Sink that turns audio bytes into sound.
pub trait AudioOutput: Send + Sync {
    type Stream: AudioStream + 'static;

    /// Begin playing `audio`. Must be called from within a tokio runtime.
    fn start(&self, audio: Vec<u8>) -> Result<Playing<Self::Stream>, AudioError>;
}

// =============================================================================
// Tests
// =============================================================================

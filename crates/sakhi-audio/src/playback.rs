//! Single-stream read-aloud controller.
//!
//! At most one stream is ever installed. Starting new playback always
//! releases the current handle before anything else happens, and a
//! synthesis request that was overtaken by a later `play` or `stop` is
//! thrown away when it completes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{AudioOutput, AudioStream, Playing, SpeechSynthesizer};

/// Owns a started stream until it is explicitly released.
#[derive(Debug)]
pub struct PlaybackHandle<S: AudioStream> {
    stream: S,
    text: String,
    generation: u64,
}

impl<S: AudioStream> PlaybackHandle<S> {
    /// Stop the stream and give up the handle.
    pub fn release(mut self) {
        self.stream.stop();
        tracing::debug!(generation = self.generation, "Playback handle released");
    }

    /// The text being read aloud.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Slot<S: AudioStream> {
    /// Bumped by every `play` and `stop`.
    generation: u64,
    handle: Option<PlaybackHandle<S>>,
}

struct Inner<Y, O: AudioOutput> {
    synthesizer: Y,
    output: O,
    slot: Mutex<Slot<O::Stream>>,
}

impl<Y, O: AudioOutput> Inner<Y, O> {
    fn lock(&self) -> MutexGuard<'_, Slot<O::Stream>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads text aloud through a synthesizer and an output.
///
/// Cheap to clone; clones share the same playback slot.
pub struct PlaybackController<Y, O: AudioOutput> {
    inner: Arc<Inner<Y, O>>,
}

impl<Y, O: AudioOutput> Clone for PlaybackController<Y, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Y, O> PlaybackController<Y, O>
where
    Y: SpeechSynthesizer + 'static,
    O: AudioOutput + 'static,
{
    pub fn new(synthesizer: Y, output: O) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                output,
                slot: Mutex::new(Slot {
                    generation: 0,
                    handle: None,
                }),
            }),
        }
    }

    /// Whether a stream is currently installed.
    pub fn is_playing(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    /// Text of the installed stream.
    pub fn playing_text(&self) -> Option<String> {
        self.inner.lock().handle.as_ref().map(|h| h.text().to_string())
    }

    /// Read `text` aloud, replacing whatever is playing.
    ///
    /// Failures are logged and leave nothing playing.
    pub async fn play(&self, text: &str) {
        let generation = {
            let mut slot = self.inner.lock();
            slot.generation += 1;
            if let Some(handle) = slot.handle.take() {
                handle.release();
            }
            slot.generation
        };

        tracing::debug!(generation, chars = text.chars().count(), "Requesting speech");
        let audio = match self.inner.synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(generation, error = %e, "Speech synthesis failed");
                return;
            }
        };

        let mut slot = self.inner.lock();
        if slot.generation != generation {
            tracing::debug!(generation, current = slot.generation, "Discarding superseded speech");
            return;
        }

        let Playing { stream, finished } = match self.inner.output.start(audio) {
            Ok(playing) => playing,
            Err(e) => {
                tracing::error!(generation, error = %e, "Audio playback failed to start");
                return;
            }
        };
        slot.handle = Some(PlaybackHandle {
            stream,
            text: text.to_string(),
            generation,
        });
        drop(slot);
        tracing::info!(generation, "Playback started");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // A dropped sender also means the stream is gone.
            let _ = finished.await;
            let mut slot = inner.lock();
            if slot.handle.as_ref().map(PlaybackHandle::generation) == Some(generation) {
                if let Some(handle) = slot.handle.take() {
                    handle.release();
                }
                tracing::info!(generation, "Playback finished");
            }
        });
    }

    /// Stop and release the current stream, and drop any pending request.
    pub fn stop(&self) {
        let mut slot = self.inner.lock();
        slot.generation += 1;
        if let Some(handle) = slot.handle.take() {
            handle.release();
            tracing::info!("Playback stopped");
        }
    }
}

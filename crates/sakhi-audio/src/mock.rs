//! Mock synthesizer and output for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{AudioError, AudioOutput, AudioStream, Playing, SpeechSynthesizer};

/// Mock synthesizer: the "audio" is the UTF-8 bytes of the text.
#[derive(Debug, Clone, Default)]
pub struct MockSpeechSynthesizer {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSpeechSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A synthesizer whose every request fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of synthesis requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(AudioError::Synthesis("mock synthesis failure".to_string()));
        }
        Ok(text.as_bytes().to_vec())
    }
}

#[derive(Debug, Default)]
struct MockOutputState {
    started: Vec<Vec<u8>>,
    stopped: Vec<usize>,
    finishers: Vec<Option<oneshot::Sender<()>>>,
}

/// Mock output that records every stream it starts and every stop.
///
/// Streams never end on their own; call [`MockAudioOutput::finish`] to
/// simulate natural completion.
#[derive(Debug, Clone, Default)]
pub struct MockAudioOutput {
    fail: bool,
    state: Arc<Mutex<MockOutputState>>,
}

impl MockAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output that refuses to start any stream.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Audio of every stream started so far, in start order.
    pub fn started(&self) -> Vec<Vec<u8>> {
        match self.state.lock() {
            Ok(state) => state.started.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Indices (start order) of the streams that were stopped.
    pub fn stopped(&self) -> Vec<usize> {
        match self.state.lock() {
            Ok(state) => state.stopped.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// End stream `index` as if the audio ran out. Returns false if it was
    /// already finished or never started.
    pub fn finish(&self, index: usize) -> bool {
        let sender = match self.state.lock() {
            Ok(mut state) => state.finishers.get_mut(index).and_then(Option::take),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

impl AudioOutput for MockAudioOutput {
    type Stream = MockStream;

    fn start(&self, audio: Vec<u8>) -> Result<Playing<MockStream>, AudioError> {
        if self.fail {
            return Err(AudioError::Output("mock output failure".to_string()));
        }

        let (tx, rx) = oneshot::channel();
        let mut state = self
            .state
            .lock()
            .map_err(|_| AudioError::Output("mock state poisoned".to_string()))?;
        let index = state.started.len();
        state.started.push(audio);
        state.finishers.push(Some(tx));
        tracing::debug!(index, "Mock stream started");

        Ok(Playing {
            stream: MockStream {
                index,
                stopped: false,
                state: Arc::clone(&self.state),
            },
            finished: rx,
        })
    }
}

/// Stream handed out by [`MockAudioOutput`].
#[derive(Debug)]
pub struct MockStream {
    index: usize,
    stopped: bool,
    state: Arc<Mutex<MockOutputState>>,
}

impl MockStream {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl AudioStream for MockStream {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Ok(mut state) = self.state.lock() {
            state.stopped.push(self.index);
            if let Some(tx) = state.finishers.get_mut(self.index).and_then(Option::take) {
                let _ = tx.send(());
            }
        }
    }
}

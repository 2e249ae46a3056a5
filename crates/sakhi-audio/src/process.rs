//! Audio output backed by an external player process.
//!
//! The synthesized bytes are written to a temporary file whose path is
//! appended to the configured player command line. Stopping the stream kills
//! the player; the file is removed once the player is gone.

use std::io::Write;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;

use sakhi_core::config::PlaybackConfig;

use crate::{AudioError, AudioOutput, AudioStream, Playing};

/// Plays audio by launching `command args... <file>`.
#[derive(Debug, Clone)]
pub struct ProcessAudioOutput {
    command: String,
    args: Vec<String>,
}

impl ProcessAudioOutput {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.player_command.clone(), config.player_args.clone())
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl AudioOutput for ProcessAudioOutput {
    type Stream = ProcessStream;

    fn start(&self, audio: Vec<u8>) -> Result<Playing<ProcessStream>, AudioError> {
        if audio.is_empty() {
            return Err(AudioError::Output("no audio data".to_string()));
        }

        let mut file = tempfile::Builder::new()
            .prefix("sakhi-tts-")
            .suffix(".audio")
            .tempfile()?;
        file.write_all(&audio)?;
        file.flush()?;
        let path = file.into_temp_path();

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(path.as_os_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Output(format!("failed to launch {}: {}", self.command, e)))?;

        tracing::debug!(
            command = %self.command,
            pid = child.id().unwrap_or_default(),
            bytes = audio.len(),
            "Player launched"
        );

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => tracing::debug!(%status, "Player exited"),
                    Err(e) => tracing::warn!(error = %e, "Failed to wait for player"),
                },
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "Failed to kill player");
                    }
                }
            }
            if let Err(e) = path.close() {
                tracing::warn!(error = %e, "Failed to remove audio file");
            }
            let _ = done_tx.send(());
        });

        Ok(Playing {
            stream: ProcessStream {
                kill: Some(kill_tx),
            },
            finished: done_rx,
        })
    }
}

/// A running player process. Dropping it without `stop` also ends playback.
#[derive(Debug)]
pub struct ProcessStream {
    kill: Option<oneshot::Sender<()>>,
}

impl AudioStream for ProcessStream {
    fn stop(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

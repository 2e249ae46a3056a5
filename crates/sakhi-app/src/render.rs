//! Terminal rendering of the conversation.
//!
//! The renderer numbers entries in log order so `/play <n>` can refer to
//! them; a session reset starts the numbering over.

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use sakhi_chat::{format_with, AnsiMarkup};
use sakhi_core::events::ConversationEvent;
use sakhi_core::types::ChatMessage;

/// Render one log entry as a terminal line.
pub fn render_message(index: usize, message: &ChatMessage) -> String {
    let who = if message.author.is_user() { "You" } else { "Sakhi" };
    format!(
        "[{}] {}: {}",
        index,
        who,
        format_with(&message.text, &AnsiMarkup)
    )
}

pub struct Renderer<W> {
    out: W,
    shown: usize,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: 0 }
    }

    /// Print an entry with the next number.
    pub fn show(&mut self, message: &ChatMessage) -> io::Result<()> {
        self.shown += 1;
        writeln!(self.out, "{}", render_message(self.shown, message))
    }

    /// Apply one event. Returns true when the view should scroll.
    pub fn handle(&mut self, event: &ConversationEvent) -> io::Result<bool> {
        match event {
            ConversationEvent::MessageAppended { message } => {
                self.show(message)?;
                Ok(false)
            }
            ConversationEvent::LoadingChanged { loading: true } => {
                writeln!(self.out, "    ...")?;
                Ok(false)
            }
            ConversationEvent::SessionReset { session_id, .. } => {
                self.shown = 0;
                writeln!(self.out, "--- new session {} ---", session_id)?;
                Ok(false)
            }
            ConversationEvent::ScrollRequested => Ok(true),
            _ => Ok(false),
        }
    }

    /// Bring the newest output into view.
    pub fn scroll(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Consume conversation events until the channel closes.
///
/// Scroll requests are honoured after `scroll_delay` so a burst of entries
/// lands before the view moves.
pub async fn run<W: Write>(
    mut events: broadcast::Receiver<ConversationEvent>,
    mut renderer: Renderer<W>,
    scroll_delay: Duration,
) {
    loop {
        match events.recv().await {
            Ok(event) => match renderer.handle(&event) {
                Ok(true) => {
                    tokio::time::sleep(scroll_delay).await;
                    if let Err(e) = renderer.scroll() {
                        tracing::warn!(error = %e, "Failed to flush output");
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to render event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind; some events were not shown");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("Renderer stopped");
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, SessionId};

/// Events emitted by the conversation controller after each state change.
///
/// Consumed by whatever front end is attached (the terminal renderer in
/// `sakhi-app`, a test harness, ...). Delivery is best effort over a
/// broadcast channel; a slow consumer may miss events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConversationEvent {
    /// An entry was appended to the log.
    MessageAppended { message: ChatMessage },

    /// The in-flight indicator changed.
    LoadingChanged { loading: bool },

    /// The log was replaced and a new session started.
    SessionReset {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },

    /// The view should scroll to the newest entry once layout settles.
    ScrollRequested,
}

impl ConversationEvent {
    /// Short machine-readable name, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversationEvent::MessageAppended { .. } => "message_appended",
            ConversationEvent::LoadingChanged { .. } => "loading_changed",
            ConversationEvent::SessionReset { .. } => "session_reset",
            ConversationEvent::ScrollRequested => "scroll_requested",
        }
    }
}

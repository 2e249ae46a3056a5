//! Append-only conversation log.

use sakhi_core::types::ChatMessage;

/// Chronological record of a conversation.
///
/// Entries are only ever appended; a reset replaces the whole log.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }

    /// Most recent assistant entry, used by read-aloud.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.entries.iter().rev().find(|m| !m.author.is_user())
    }
}

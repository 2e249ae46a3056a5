//! Session continuity state.
//!
//! The service keeps no memory of its own between calls; each request carries
//! the session identifier plus the text and mode of the last reply so the
//! router can tell whether the user is answering a question it asked.

use sakhi_core::types::SessionId;

/// Identity and rolling context of one logical conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    session_id: SessionId,
    previous_response: Option<String>,
    previous_mode: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Start a conversation with a freshly generated identifier.
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(session_id: SessionId) -> Self {
        Self {
            session_id,
            previous_response: None,
            previous_mode: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Display text of the most recent successful reply.
    pub fn previous_response(&self) -> Option<&str> {
        self.previous_response.as_deref()
    }

    /// Mode reported alongside the most recent successful reply.
    pub fn previous_mode(&self) -> Option<&str> {
        self.previous_mode.as_deref()
    }

    /// Record a successful reply. Only the controller's success path calls this.
    pub(crate) fn record_reply(&mut self, display_text: String, mode: Option<String>) {
        self.previous_response = Some(display_text);
        self.previous_mode = mode;
    }

    /// A brand-new state whose identifier differs from this one.
    pub fn renewed(&self) -> Self {
        Self::with_id(SessionId::generate_distinct(&self.session_id))
    }
}

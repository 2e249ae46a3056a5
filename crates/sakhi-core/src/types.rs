use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who wrote a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// Typed or uploaded by the person at the keyboard.
    User,
    /// Produced by the remote assistant, or a local notice shown in its place.
    Assistant,
}

impl Author {
    pub fn is_user(&self) -> bool {
        matches!(self, Author::User)
    }
}

// =============================================================================
// Session identity
// =============================================================================

/// Opaque, server-recognized conversation identifier.
///
/// Formatted as `session_` followed by nine lowercase base-36 characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Number of random base-36 characters after the `session_` prefix.
const SESSION_SUFFIX_LEN: usize = 9;

impl SessionId {
    /// Generate a fresh random session identifier.
    pub fn generate() -> Self {
        let mut entropy = Uuid::new_v4().as_u128();
        let mut suffix = String::with_capacity(SESSION_SUFFIX_LEN);
        for _ in 0..SESSION_SUFFIX_LEN {
            let digit = (entropy % 36) as u32;
            suffix.push(char::from_digit(digit, 36).unwrap_or('0'));
            entropy /= 36;
        }
        Self(format!("session_{}", suffix))
    }

    /// Generate an identifier guaranteed to differ from `previous`.
    pub fn generate_distinct(previous: &SessionId) -> Self {
        loop {
            let candidate = Self::generate();
            if &candidate != previous {
                return candidate;
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Turns
// =============================================================================

/// A document picked by the user for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    /// File name as shown to the user and sent to the service.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Body of a turn: literal text or an attached file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnContent {
    Text(String),
    File(FileRef),
}

/// One exchange unit authored by the user or the assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub content: TurnContent,
    /// Document category for file turns (e.g. "Aadhaar Card").
    pub doc_type: Option<String>,
    pub author: Author,
}

impl Turn {
    /// A typed user message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            content: TurnContent::Text(text.into()),
            doc_type: None,
            author: Author::User,
        }
    }

    /// A user document upload.
    pub fn user_file(file: FileRef, doc_type: Option<String>) -> Self {
        Self {
            content: TurnContent::File(file),
            doc_type,
            author: Author::User,
        }
    }

    /// The attached file, if any.
    pub fn file(&self) -> Option<&FileRef> {
        match &self.content {
            TurnContent::File(file) => Some(file),
            TurnContent::Text(_) => None,
        }
    }

    /// Whether the turn carries nothing worth sending: no file and only
    /// whitespace text.
    pub fn is_blank(&self) -> bool {
        match &self.content {
            TurnContent::Text(text) => text.trim().is_empty(),
            TurnContent::File(_) => false,
        }
    }
}

// =============================================================================
// Log entries
// =============================================================================

/// Upload details kept on a log entry (the file bytes are not retained).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub doc_type: Option<String>,
}

/// A single entry in the conversation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: Author,
    /// Raw text; formatting is applied only at render time.
    pub text: String,
    pub attachment: Option<AttachmentInfo>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            text: text.into(),
            attachment: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text)
    }

    pub fn with_attachment(mut self, attachment: AttachmentInfo) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

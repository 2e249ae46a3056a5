//! Conversation core for Sakhi.
//!
//! Normalizes assistant replies into display text, tracks the session
//! continuity state the service needs between turns, and sequences user turns
//! through a pluggable transport.

pub mod controller;
pub mod error;
pub mod format;
pub mod log;
pub mod normalizer;
pub mod session;
pub mod transport;

pub use controller::{ConversationController, SubmitOutcome};
pub use error::TransportError;
pub use format::{format_message, format_with, AnsiMarkup, HtmlMarkup, Markup};
pub use log::MessageLog;
pub use normalizer::{normalize, ResponsePayload};
pub use session::SessionState;
pub use transport::{ChatTransport, TurnReply, TurnRequest};

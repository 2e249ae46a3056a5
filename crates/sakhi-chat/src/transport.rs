//! Boundary between the conversation core and the remote assistant service.

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use sakhi_core::types::{FileRef, SessionId};

use crate::error::TransportError;
use crate::normalizer::ResponsePayload;

/// One outgoing chat request.
///
/// Optional fields are `None` whenever the service should not receive them;
/// transports send exactly the fields that are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// User text, or the upload marker for document turns.
    pub message: String,
    pub session_id: SessionId,
    pub previous_response: Option<String>,
    pub previous_mode: Option<String>,
    pub file: Option<FileRef>,
    pub doc_type: Option<String>,
}

/// Decoded body of a chat reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TurnReply {
    /// Raw payload; JSON null when the service omitted it.
    #[serde(default)]
    pub response: Value,
    /// Router mode the service is now in (e.g. `form_filling`).
    #[serde(default)]
    pub mode: Option<String>,
}

impl TurnReply {
    pub fn new(response: impl Into<Value>, mode: Option<&str>) -> Self {
        Self {
            response: response.into(),
            mode: mode.map(str::to_string),
        }
    }

    /// The payload as the normalizer's tagged union.
    pub fn payload(&self) -> ResponsePayload {
        ResponsePayload::from(self.response.clone())
    }
}

/// Request/response capability supplied by the host application.
pub trait ChatTransport: Send + Sync {
    /// Send one turn and wait for the service's reply.
    fn send_turn(
        &self,
        request: TurnRequest,
    ) -> impl Future<Output = Result<TurnReply, TransportError>> + Send;
}

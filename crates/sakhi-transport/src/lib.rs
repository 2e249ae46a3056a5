//! HTTP client for the Sakhi assistant service.
//!
//! One [`HttpTransport`] serves both capabilities the conversation needs:
//! chat turns go to the router endpoint as multipart form data, and
//! read-aloud text goes to the speech endpoint as JSON.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;

use sakhi_audio::{AudioError, SpeechSynthesizer};
use sakhi_chat::{ChatTransport, TransportError, TurnReply, TurnRequest};
use sakhi_core::config::ServiceConfig;

/// reqwest-backed client for the chat router and speech endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    chat_url: String,
    speech_url: String,
}

impl HttpTransport {
    /// Build a client for the endpoints named in `config`.
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            speech_url: config.speech_url(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn speech_url(&self) -> &str {
        &self.speech_url
    }
}

/// Multipart body for one turn. Absent optional fields are left out.
fn build_form(request: TurnRequest) -> Form {
    let mut form = Form::new()
        .text("message", request.message)
        .text("session_id", request.session_id.to_string());

    if let Some(previous) = request.previous_response {
        form = form.text("prev_res", previous);
    }
    if let Some(mode) = request.previous_mode {
        form = form.text("prev_res_mode", mode);
    }
    if let Some(file) = request.file {
        form = form.part("file", Part::bytes(file.bytes).file_name(file.name));
    }
    if let Some(doc_type) = request.doc_type {
        form = form.text("doc_type", doc_type);
    }
    form
}

impl ChatTransport for HttpTransport {
    async fn send_turn(&self, request: TurnRequest) -> Result<TurnReply, TransportError> {
        let session_id = request.session_id.clone();
        let form = build_form(request);

        let resp = self
            .client
            .post(&self.chat_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(session_id = %session_id, status = status.as_u16(), "Chat service error");
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tracing::debug!(session_id = %session_id, bytes = body.len(), "Chat reply received");

        serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl SpeechSynthesizer for HttpTransport {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        let resp = self
            .client
            .post(&self.speech_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| AudioError::Synthesis(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AudioError::Synthesis(format!(
                "service returned status {}",
                status.as_u16()
            )));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| AudioError::Synthesis(e.to_string()))?;
        tracing::debug!(bytes = audio.len(), "Speech audio received");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_config() {
        let config = ServiceConfig {
            base_url: "http://assistant.local:9015/".to_string(),
            ..ServiceConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.chat_url(),
            "http://assistant.local:9015/smart-chat-router-ladki-bahin"
        );
        assert_eq!(transport.speech_url(), "http://assistant.local:9015/api/tts");
    }

    #[test]
    fn test_zero_timeout_builds() {
        let config = ServiceConfig {
            timeout_secs: 0,
            ..ServiceConfig::default()
        };
        assert!(HttpTransport::new(&config).is_ok());
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SakhiError};

/// Top-level configuration for the Sakhi client.
///
/// Loaded from `~/.sakhi/config.toml` by default. Every section falls back to
/// its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SakhiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl SakhiConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SakhiConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SakhiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote assistant service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Scheme, host and port of the assistant service.
    pub base_url: String,
    /// Path of the chat router endpoint.
    pub chat_path: String,
    /// Path of the text-to-speech endpoint.
    pub speech_path: String,
    /// Whole-request timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9015".to_string(),
            chat_path: "/smart-chat-router-ladki-bahin".to_string(),
            speech_path: "/api/tts".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    /// Full URL of the speech endpoint.
    pub fn speech_url(&self) -> String {
        join_url(&self.base_url, &self.speech_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Conversation texts and document catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// First assistant entry of a new conversation.
    pub greeting: String,
    /// Acknowledgement appended after a session reset.
    pub reset_message: String,
    /// Shown in place of a reply when the service cannot be reached.
    pub apology_message: String,
    /// Message text sent to the service for document uploads.
    pub upload_marker: String,
    /// Document categories the user may upload.
    pub document_types: Vec<String>,
    /// Canned replies offered to the user.
    pub quick_replies: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: "नमस्कार, मी महाराष्ट्र शासनाचा एजंटिक एआय सेवा बॉट आहे. मी तुमची लाडकी बहीण योजनेच्या माहितीसाठी आणि अर्जासाठी मदत करू शकतो. तुम्ही कशा प्रकारे मदत करू इच्छिता?".to_string(),
            reset_message: "सत्र रीसेट. लाडकी बहिन योजनेबाबत मी तुम्हाला कशी मदत करू शकतो?".to_string(),
            apology_message: "क्षमस्व, काहीतरी चूक झाली. कृपया पुन्हा प्रयत्न करा.".to_string(),
            upload_marker: "Uploaded document".to_string(),
            document_types: [
                "Aadhaar Card",
                "Domicile Certificate",
                "Birth Certificate",
                "School Leaving Certificate",
                "Income Certificate",
                "Ration Card",
                "Voter ID",
                "Letter of Guarantee",
                "Bank Passbook",
                "Photograph",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            quick_replies: [
                "मी या योजनेसाठी पात्र आहे का?",
                "मला अर्ज करायचा आहे",
                "माझ्या अर्जाची स्थिती काय आहे?",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Synthesized speech playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Whether read-aloud is available at all.
    pub enabled: bool,
    /// External player executable; the audio file path is appended last.
    pub player_command: String,
    /// Arguments passed to the player before the file path.
    pub player_args: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player_command: "ffplay".to_string(),
            player_args: vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
        }
    }
}

/// Front-end behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Delay before honouring a scroll request, in milliseconds.
    pub scroll_delay_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 100,
        }
    }
}

//! Sakhi application binary - composition root.
//!
//! Ties the Sakhi crates into an interactive terminal client:
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialise tracing (stderr, so the transcript on stdout stays clean)
//! 3. Build the HTTP transport, conversation controller and read-aloud
//! 4. Render conversation events and read commands from stdin

mod cli;
mod command;
mod render;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sakhi_audio::{PlaybackController, ProcessAudioOutput};
use sakhi_chat::ConversationController;
use sakhi_core::config::{ChatConfig, GeneralConfig, SakhiConfig};
use sakhi_core::types::{FileRef, Turn};
use sakhi_transport::HttpTransport;

use cli::CliArgs;
use command::Command;
use render::{render_message, Renderer};

type Controller = ConversationController<HttpTransport>;
type Playback = PlaybackController<HttpTransport, ProcessAudioOutput>;

/// Interactive session state shared by the command handlers.
struct App {
    controller: Arc<Controller>,
    playback: Option<Playback>,
    chat: ChatConfig,
}

impl App {
    /// Run one command. Returns false when the user asked to quit.
    async fn dispatch(&self, command: Command) -> bool {
        match command {
            Command::Say(text) => self.submit(Turn::user_text(text)),
            Command::Reset => self.controller.reset(),
            Command::Docs => self.list_documents(),
            Command::Upload { doc, path } => self.upload(doc, &path).await,
            Command::Quick(None) => self.list_quick_replies(),
            Command::Quick(Some(n)) => self.quick_reply(n),
            Command::Play(n) => self.play(n),
            Command::Stop => {
                if let Some(playback) = &self.playback {
                    playback.stop();
                }
            }
            Command::History => {
                for (i, message) in self.controller.messages().iter().enumerate() {
                    println!("{}", render_message(i + 1, message));
                }
            }
            Command::Help => println!("{}", command::HELP),
            Command::Quit => return false,
        }
        true
    }

    /// Submissions run in the background so input stays responsive.
    fn submit(&self, turn: Turn) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            controller.submit(turn).await;
        });
    }

    fn list_documents(&self) {
        println!("Document types:");
        for (i, doc) in self.chat.document_types.iter().enumerate() {
            println!("  {}. {}", i + 1, doc);
        }
    }

    fn list_quick_replies(&self) {
        println!("Quick replies:");
        for (i, reply) in self.chat.quick_replies.iter().enumerate() {
            println!("  {}. {}", i + 1, reply);
        }
    }

    fn quick_reply(&self, n: usize) {
        let Some(text) = self.chat.quick_replies.get(n - 1).cloned() else {
            println!("! no quick reply {}, see /quick", n);
            return;
        };
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            controller.quick_reply(text).await;
        });
    }

    async fn upload(&self, doc: usize, path: &Path) {
        let Some(doc_type) = self.chat.document_types.get(doc - 1).cloned() else {
            println!("! no document type {}, see /docs", doc);
            return;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read upload");
                println!("! cannot read {}: {}", path.display(), e);
                return;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.controller.select_document_type(doc_type.clone());
        self.submit(Turn::user_file(FileRef::new(name, bytes), Some(doc_type)));
    }

    fn play(&self, n: Option<usize>) {
        let Some(playback) = &self.playback else {
            println!("! read-aloud is disabled");
            return;
        };
        let text = match n {
            None => self.controller.last_assistant_text(),
            Some(n) => self
                .controller
                .messages()
                .get(n - 1)
                .map(|m| m.text.clone()),
        };
        let Some(text) = text else {
            println!("! nothing to read");
            return;
        };

        let playback = playback.clone();
        tokio::spawn(async move {
            playback.play(&text).await;
        });
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = SakhiConfig::load(&config_file);
    let config_level = match &loaded {
        Ok(config) => config.general.log_level.clone(),
        Err(_) => GeneralConfig::default().log_level,
    };
    init_tracing(&args.resolve_log_level(&config_level));

    tracing::info!("Starting Sakhi v{}", env!("CARGO_PKG_VERSION"));
    let mut config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config, using defaults");
            SakhiConfig::default()
        }
    };

    if let Some(server) = args.server.clone() {
        config.service.base_url = server;
    }
    if args.no_audio {
        config.playback.enabled = false;
    }
    if args.save_config {
        config.save(&config_file)?;
    }

    let transport = HttpTransport::new(&config.service)?;
    tracing::info!(url = %transport.chat_url(), "Assistant service configured");

    let controller = Arc::new(ConversationController::new(
        transport.clone(),
        config.chat.clone(),
    ));
    let playback = if config.playback.enabled {
        tracing::info!(player = %config.playback.player_command, "Read-aloud enabled");
        Some(PlaybackController::new(
            transport,
            ProcessAudioOutput::from_config(&config.playback),
        ))
    } else {
        tracing::info!("Read-aloud disabled");
        None
    };

    // Show what is already in the log, then follow new events.
    let events = controller.subscribe();
    let mut renderer = Renderer::new(io::stdout());
    for message in controller.messages() {
        renderer.show(&message)?;
    }
    let render_task = tokio::spawn(render::run(
        events,
        renderer,
        Duration::from_millis(config.ui.scroll_delay_ms),
    ));
    println!("Type /help for commands.");

    let app = App {
        controller,
        playback,
        chat: config.chat,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match command::parse(&line) {
            Ok(cmd) => {
                if !app.dispatch(cmd).await {
                    break;
                }
            }
            Err(e) => println!("! {}", e),
        }
    }

    if let Some(playback) = &app.playback {
        playback.stop();
    }
    render_task.abort();
    tracing::info!("Sakhi exiting");
    Ok(())
}

//! Parsing of REPL input lines.
//!
//! Anything not starting with `/` is a chat message. A leading `//` sends a
//! message that itself starts with a slash.

use std::path::PathBuf;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain chat message.
    Say(String),
    Reset,
    /// List the document categories.
    Docs,
    /// Upload `path` as document category `doc` (1-based).
    Upload { doc: usize, path: PathBuf },
    /// List quick replies, or send quick reply `n` (1-based).
    Quick(Option<usize>),
    /// Read message `n` aloud, or the latest assistant reply.
    Play(Option<usize>),
    Stop,
    History,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("/{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("'{0}' is not a positive number")]
    InvalidNumber(String),
}

pub const HELP: &str = "\
Commands:
  /reset                 start a new session
  /docs                  list document types
  /upload <doc#> <path>  upload a document of the given type
  /quick [n]             list quick replies, or send reply n
  /play [message#]       read a message aloud (default: latest reply)
  /stop                  stop reading aloud
  /history               show the whole conversation
  /help                  show this help
  /quit                  exit
Anything else is sent as a message; start with // to send a leading slash.";

/// Parse one input line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("//") {
        return Ok(Command::Say(format!("/{}", rest)));
    }
    let Some(body) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let body = body.trim();
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    match name {
        "reset" => Ok(Command::Reset),
        "docs" => Ok(Command::Docs),
        "upload" => parse_upload(rest),
        "quick" => Ok(Command::Quick(optional_number(rest)?)),
        "play" => Ok(Command::Play(optional_number(rest)?)),
        "stop" => Ok(Command::Stop),
        "history" => Ok(Command::History),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_upload(rest: &str) -> Result<Command, CommandError> {
    let (doc, path) = match rest.split_once(char::is_whitespace) {
        Some((doc, path)) => (doc, path.trim()),
        None if rest.is_empty() => {
            return Err(CommandError::MissingArgument {
                command: "upload",
                argument: "a document number",
            })
        }
        None => (rest, ""),
    };
    let doc = number(doc)?;
    if path.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "upload",
            argument: "a file path",
        });
    }
    Ok(Command::Upload {
        doc,
        path: PathBuf::from(path),
    })
}

fn optional_number(rest: &str) -> Result<Option<usize>, CommandError> {
    if rest.is_empty() {
        Ok(None)
    } else {
        number(rest).map(Some)
    }
}

fn number(text: &str) -> Result<usize, CommandError> {
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidNumber(text.to_string())),
    }
}

//! Render-time formatting of log entries.
//!
//! Two textual substitutions, in order: `**text**` becomes bold markup, then
//! every newline becomes a line-break marker. The log itself always keeps the
//! raw text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid bold regex"));

/// Target-specific markup for the two supported substitutions.
pub trait Markup {
    /// Wrap `inner` in bold markup.
    fn bold(&self, inner: &str) -> String;
    /// Marker that replaces a newline.
    fn line_break(&self) -> &str;
}

/// `<b>…</b>` and `<br>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkup;

impl Markup for HtmlMarkup {
    fn bold(&self, inner: &str) -> String {
        format!("<b>{}</b>", inner)
    }

    fn line_break(&self) -> &str {
        "<br>"
    }
}

/// SGR bold for terminals; newlines stay newlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiMarkup;

impl Markup for AnsiMarkup {
    fn bold(&self, inner: &str) -> String {
        format!("\x1b[1m{}\x1b[0m", inner)
    }

    fn line_break(&self) -> &str {
        "\n"
    }
}

/// Format `text` with HTML markup.
pub fn format_message(text: &str) -> String {
    format_with(text, &HtmlMarkup)
}

/// Format `text` with the given markup.
pub fn format_with<M: Markup + ?Sized>(text: &str, markup: &M) -> String {
    if text.is_empty() {
        return String::new();
    }
    BOLD.replace_all(text, |caps: &Captures| markup.bold(&caps[1]))
        .replace('\n', markup.line_break())
}

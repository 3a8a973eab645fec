//! Inline emphasis: `**strong**`, `*emphasis*` and `` `code` ``.
//!
//! The three substitutions run one after another over the whole block text,
//! strong first so its double asterisks are consumed before single ones.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static STRONG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static EMPHASIS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").unwrap());

/// How each kind of inline span is drawn.
pub trait InlineStyle {
    fn strong(&self, text: &str) -> String;
    fn emphasis(&self, text: &str) -> String;
    fn code(&self, text: &str) -> String;
}

/// `<strong>`, `<em>` and `<code>` tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkup;

impl InlineStyle for HtmlMarkup {
    fn strong(&self, text: &str) -> String {
        format!("<strong>{}</strong>", text)
    }

    fn emphasis(&self, text: &str) -> String {
        format!("<em>{}</em>", text)
    }

    fn code(&self, text: &str) -> String {
        format!("<code>{}</code>", text)
    }
}

/// ANSI styling via `console`; degrades to plain text when colors are off.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStyle;

impl InlineStyle for TerminalStyle {
    fn strong(&self, text: &str) -> String {
        console::style(text).bold().to_string()
    }

    fn emphasis(&self, text: &str) -> String {
        console::style(text).italic().to_string()
    }

    fn code(&self, text: &str) -> String {
        console::style(text).cyan().to_string()
    }
}

pub fn render_inline(text: &str, style: &dyn InlineStyle) -> String {
    let text = STRONG_REGEX.replace_all(text, |c: &Captures| style.strong(&c[1]));
    let text = EMPHASIS_REGEX.replace_all(&text, |c: &Captures| style.emphasis(&c[1]));
    let text = CODE_REGEX.replace_all(&text, |c: &Captures| style.code(&c[1]));
    text.into_owned()
}

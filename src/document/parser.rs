//! Line classifier turning loosely marked-up report text into sections.
//!
//! Each line is trimmed and matched against, in order: blank, `### `, `## `,
//! `# `, `- ` / `• `, `N. `, paragraph. The first match wins, so a header
//! is never mistaken for a list item.

use super::types::{Block, Document, Section, TocEntry};
use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s").unwrap());

const HEADER_MARKERS: [(&str, u8); 3] = [("### ", 3), ("## ", 2), ("# ", 1)];
const BULLET_MARKERS: [&str; 2] = ["- ", "• "];

/// Classification of a single trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Header { level: u8, title: &'a str },
    Block(Block),
}

fn classify(line: &str) -> Line<'_> {
    if line.is_empty() {
        return Line::Blank;
    }
    for (marker, level) in HEADER_MARKERS {
        if let Some(title) = line.strip_prefix(marker) {
            return Line::Header { level, title };
        }
    }
    for marker in BULLET_MARKERS {
        if let Some(rest) = line.strip_prefix(marker) {
            return Line::Block(Block::Bullet(rest.trim().to_string()));
        }
    }
    if NUMBERED_REGEX.is_match(line) {
        return Line::Block(Block::Numbered(line.to_string()));
    }
    Line::Block(Block::Paragraph(line.to_string()))
}

/// Incremental parser; feed lines with [`DocumentParser::push_line`] and
/// collect the result with [`DocumentParser::finish`].
#[derive(Debug, Default)]
pub struct DocumentParser {
    sections: Vec<Section>,
    current: Section,
}

impl DocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_current(&mut self) {
        let section = std::mem::take(&mut self.current);
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    pub fn push_line(&mut self, raw: &str) {
        match classify(raw.trim()) {
            Line::Blank => {
                if !self.current.blocks.is_empty() {
                    self.current.blocks.push(Block::Break);
                }
            }
            Line::Header { level, title } => {
                self.close_current();
                self.current = Section::new(title, level);
            }
            Line::Block(block) => self.current.blocks.push(block),
        }
    }

    pub fn finish(mut self) -> Document {
        self.close_current();
        let toc = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| TocEntry {
                ordinal: i + 1,
                title: s.title.clone(),
                level: s.level,
            })
            .collect();
        Document {
            sections: self.sections,
            toc,
        }
    }
}

/// Parse `text` into sections and a table of contents. Never fails.
pub fn parse_document(text: &str) -> Document {
    let mut parser = DocumentParser::new();
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}

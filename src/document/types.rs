use serde::{Deserialize, Serialize};

/// One line-level element inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Block {
    Paragraph(String),
    /// Bullet text with the `- ` / `• ` marker removed
    Bullet(String),
    /// The full line, numeral included
    Numbered(String),
    /// A blank line between blocks
    Break,
}

impl Block {
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Paragraph(t) | Block::Bullet(t) | Block::Numbered(t) => Some(t),
            Block::Break => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Empty for content that appears before the first header
    pub title: String,
    /// 1 to 3 for headed sections, 0 when `title` is empty
    pub level: u8,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(title: &str, level: u8) -> Self {
        Self {
            title: title.to_string(),
            level,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// 1-based position among emitted sections
    pub ordinal: usize,
    pub title: String,
    pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub sections: Vec<Section>,
    pub toc: Vec<TocEntry>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

//! Report text to structured document: sections, table of contents, inline
//! emphasis, terminal rendering and plain-text export.

pub mod export;
pub mod inline;
pub mod parser;
pub mod render;
pub mod types;

pub use export::{export_file_name, resolve_export_path, write_report};
pub use inline::{HtmlMarkup, InlineStyle, TerminalStyle, render_inline};
pub use parser::{DocumentParser, parse_document};
pub use render::{RenderOptions, ReportMeta, render_document, render_report};
pub use types::{Block, Document, Section, TocEntry};

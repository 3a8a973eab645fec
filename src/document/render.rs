//! Terminal projection of a parsed report.

use chrono::{DateTime, Utc};
use console::style;
use textwrap::Options;

use super::inline::{InlineStyle, render_inline};
use super::types::{Block, Document, Section};

const SUBTITLE: &str = "Professional Multi-Agent Investment Analysis";
const FOOTER_TAG: &str = "Multi-Agent Financial Analysis System";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Wrap column for paragraphs and list items
    pub width: usize,
    pub toc: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 80,
            toc: true,
        }
    }
}

impl RenderOptions {
    /// Width of the attached terminal, capped to keep lines readable.
    pub fn for_terminal() -> Self {
        let (_, cols) = console::Term::stdout().size();
        Self {
            width: (cols as usize).clamp(40, 100),
            ..Self::default()
        }
    }
}

/// What the title page says about the run that produced the report.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub query: String,
    pub team: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

fn rule(width: usize) -> String {
    "─".repeat(width)
}

fn render_toc(doc: &Document, out: &mut String) {
    out.push_str(&format!("{}\n", style("Table of Contents").bold()));
    for entry in &doc.toc {
        let indent = "  ".repeat(entry.level.saturating_sub(1) as usize + 1);
        out.push_str(&format!("{}{}. {}\n", indent, entry.ordinal, entry.title));
    }
}

fn render_heading(ordinal: usize, section: &Section) -> String {
    let heading = format!("{}. {}", ordinal, section.title);
    match section.level {
        1 => style(heading).bold().cyan().to_string(),
        2 => style(heading).bold().to_string(),
        _ => style(heading).underlined().to_string(),
    }
}

fn render_block(block: &Block, inline: &dyn InlineStyle, width: usize, out: &mut String) {
    match block {
        Block::Paragraph(text) | Block::Numbered(text) => {
            out.push_str(&textwrap::fill(&render_inline(text, inline), width));
            out.push('\n');
        }
        Block::Bullet(text) => {
            let opts = Options::new(width)
                .initial_indent("  • ")
                .subsequent_indent("    ");
            out.push_str(&textwrap::fill(&render_inline(text, inline), opts));
            out.push('\n');
        }
        Block::Break => out.push('\n'),
    }
}

/// Sections (and optionally the table of contents) without a title page.
pub fn render_document(doc: &Document, inline: &dyn InlineStyle, opts: &RenderOptions) -> String {
    let mut out = String::new();
    if opts.toc && !doc.toc.is_empty() {
        render_toc(doc, &mut out);
        out.push('\n');
    }
    for (i, section) in doc.sections.iter().enumerate() {
        if !section.title.is_empty() {
            out.push_str(&render_heading(i + 1, section));
            out.push('\n');
        }
        for block in &section.blocks {
            render_block(block, inline, opts.width, &mut out);
        }
        out.push('\n');
    }
    out
}

/// Full report: title page, document body and footer.
pub fn render_report(
    meta: &ReportMeta,
    doc: &Document,
    inline: &dyn InlineStyle,
    opts: &RenderOptions,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", style(&meta.title).bold().cyan()));
    out.push_str(&format!("{}\n\n", style(SUBTITLE).dim()));
    out.push_str(&format!(
        "{} {}\n",
        style("Date:").bold(),
        meta.generated_at.format("%A, %B %-d, %Y")
    ));
    out.push_str(&format!("{} {}\n", style("Query:").bold(), meta.query));
    if !meta.team.is_empty() {
        out.push_str(&format!(
            "{} {}\n",
            style("Analysis Team:").bold(),
            meta.team.join(", ")
        ));
    }
    out.push_str(&format!("{}\n\n", rule(opts.width)));

    out.push_str(&render_document(doc, inline, opts));

    out.push_str(&format!("{}\n", rule(opts.width)));
    out.push_str(&format!(
        "{}  Generated on {}\n",
        style(FOOTER_TAG).bold(),
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HtmlMarkup, parse_document};
    use chrono::TimeZone;

    fn opts() -> RenderOptions {
        RenderOptions {
            width: 40,
            toc: true,
        }
    }

    #[test]
    fn test_document_numbers_sections_and_lists_toc() {
        let doc = parse_document("# Summary\nBuy.\n## Risks\n- Rates");
        let out = render_document(&doc, &HtmlMarkup, &opts());
        assert!(out.contains("Table of Contents"));
        assert!(out.contains("  1. Summary\n"));
        assert!(out.contains("    2. Risks\n"));
        assert!(out.contains("1. Summary\nBuy.\n"));
        assert!(out.contains("  • Rates\n"));
    }

    #[test]
    fn test_toc_can_be_skipped() {
        let doc = parse_document("# Summary\nBuy.");
        let out = render_document(
            &doc,
            &HtmlMarkup,
            &RenderOptions {
                toc: false,
                ..opts()
            },
        );
        assert!(!out.contains("Table of Contents"));
    }

    #[test]
    fn test_untitled_section_has_no_heading() {
        let doc = parse_document("just text");
        let out = render_document(&doc, &HtmlMarkup, &RenderOptions { toc: false, ..opts() });
        assert_eq!(out, "just text\n\n");
    }

    #[test]
    fn test_paragraphs_wrap_to_width() {
        let long = "word ".repeat(30);
        let doc = parse_document(&long);
        let out = render_document(&doc, &HtmlMarkup, &RenderOptions { toc: false, ..opts() });
        assert!(out.lines().all(|l| l.chars().count() <= 40));
        assert!(out.lines().count() > 2);
    }

    #[test]
    fn test_inline_style_applied_to_blocks() {
        let doc = parse_document("- **Strong** buy");
        let out = render_document(&doc, &HtmlMarkup, &RenderOptions { toc: false, ..opts() });
        assert!(out.contains("<strong>Strong</strong> buy"));
    }

    #[test]
    fn test_report_title_page_and_footer() {
        let meta = ReportMeta {
            title: "Financial Analysis Report".to_string(),
            query: "Analyze Apple".to_string(),
            team: vec!["Research Agent".to_string(), "Analysis Agent".to_string()],
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        };
        let doc = parse_document("# Summary\nBuy.");
        let out = render_report(&meta, &doc, &HtmlMarkup, &opts());
        assert!(out.contains("Financial Analysis Report"));
        assert!(out.contains("Friday, March 1, 2024"));
        assert!(out.contains("Analyze Apple"));
        assert!(out.contains("Research Agent, Analysis Agent"));
        assert!(out.trim_end().ends_with("Generated on 2024-03-01 09:30:00 UTC"));
    }
}

//! `finsight render`: show any report text file as a structured document.

use anyhow::{Context, Result};
use std::path::Path;

use finsight::document::{RenderOptions, TerminalStyle, parse_document, render_document};

pub fn cmd_render(file: &Path, toc: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let doc = parse_document(&text);
    if doc.is_empty() {
        println!("(empty document)");
        return Ok(());
    }

    let opts = RenderOptions {
        toc,
        ..RenderOptions::for_terminal()
    };
    print!("{}", render_document(&doc, &TerminalStyle, &opts));
    Ok(())
}

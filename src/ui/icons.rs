//! Emoji shared by the terminal UI, with plain fallbacks for dumb terminals.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// Workflow indicators
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static REPORT: Emoji<'_, '_> = Emoji("📄 ", "");

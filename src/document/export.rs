use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

pub fn export_file_name(date: DateTime<Utc>) -> String {
    format!("financial-analysis-report-{}.txt", date.format("%Y-%m-%d"))
}

/// Where an export should land.
///
/// No target means `default_dir/<dated name>`; a directory target (existing,
/// or written with a trailing separator) gets the dated name inside it; any
/// other target is used as the file path.
pub fn resolve_export_path(target: Option<&Path>, default_dir: &Path, date: DateTime<Utc>) -> PathBuf {
    let name = export_file_name(date);
    match target {
        None => default_dir.join(name),
        Some(t) if t.is_dir() || t.as_os_str().to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) => {
            t.join(name)
        }
        Some(t) => t.to_path_buf(),
    }
}

/// Write the plain-text report, creating parent directories as needed.
pub fn write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

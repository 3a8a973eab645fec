//! Stage catalog for the analysis pipeline.
//!
//! This module provides:
//! - `StageDefinition`, the static identity and display metadata of a stage
//! - `StagesFile`, the optional `.finsight/stages.json` override
//! - The built-in research → analysis → recommendation pipeline

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Static description of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageDefinition {
    /// Stable identifier, also used as the service endpoint key (e.g. "research")
    pub id: String,
    /// Display name (e.g. "Research Agent")
    pub name: String,
    /// One-line summary of what the stage does
    #[serde(default)]
    pub description: String,
    /// Capability tags shown in the stage catalog
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl StageDefinition {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// The `.finsight/stages.json` file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesFile {
    pub stages: Vec<StageDefinition>,
}

impl StagesFile {
    /// Load and validate stages from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stages file: {}", path.display()))?;

        let stages_file: StagesFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stages JSON: {}", path.display()))?;

        validate_stages(&stages_file.stages)
            .with_context(|| format!("Invalid stages file: {}", path.display()))?;

        Ok(stages_file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize stages to JSON")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write stages file: {}", path.display()))?;

        Ok(())
    }

    pub fn get_stage(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.id == id)
    }
}

/// Reject empty pipelines, blank ids and duplicate ids.
pub fn validate_stages(stages: &[StageDefinition]) -> Result<()> {
    if stages.is_empty() {
        bail!("At least one stage is required");
    }
    let mut seen = HashSet::new();
    for stage in stages {
        if stage.id.trim().is_empty() {
            bail!("Stage '{}' has an empty id", stage.name);
        }
        if !seen.insert(stage.id.as_str()) {
            bail!("Duplicate stage id '{}'", stage.id);
        }
    }
    Ok(())
}

/// The built-in three-stage pipeline.
pub fn get_default_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new(
            "research",
            "Research Agent",
            "Gathers company financial data and market information",
        )
        .with_capabilities(&["Company research", "Stock price lookup", "Market data"]),
        StageDefinition::new(
            "analysis",
            "Analysis Agent",
            "Performs financial calculations and data analysis",
        )
        .with_capabilities(&[
            "Ratio analysis",
            "Trend analysis",
            "Financial health assessment",
        ]),
        StageDefinition::new(
            "recommendation",
            "Recommendation Agent",
            "Generates investment recommendations and risk assessments",
        )
        .with_capabilities(&[
            "Investment recommendations",
            "Risk assessment",
            "Portfolio advice",
        ]),
    ]
}

/// Load stages from a file if it exists, otherwise use the built-in pipeline.
pub fn load_stages_or_default(stages_file: Option<&Path>) -> Result<Vec<StageDefinition>> {
    match stages_file {
        Some(path) if path.exists() => Ok(StagesFile::load(path)?.stages),
        _ => Ok(get_default_stages()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_stages_order() {
        let ids: Vec<_> = get_default_stages().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["research", "analysis", "recommendation"]);
    }

    #[test]
    fn test_default_stages_have_metadata() {
        for stage in get_default_stages() {
            assert!(!stage.name.is_empty());
            assert!(!stage.description.is_empty());
            assert_eq!(stage.capabilities.len(), 3);
        }
    }

    #[test]
    fn test_stage_deserialization_with_defaults() {
        let json = r#"{"id": "macro", "name": "Macro Agent"}"#;
        let stage: StageDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(stage.id, "macro");
        assert!(stage.description.is_empty());
        assert!(stage.capabilities.is_empty());
    }

    #[test]
    fn test_stages_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stages.json");
        let file = StagesFile {
            stages: get_default_stages(),
        };
        file.save(&path).unwrap();

        let loaded = StagesFile::load(&path).unwrap();
        assert_eq!(loaded.stages, get_default_stages());
        assert_eq!(
            loaded.get_stage("analysis").map(|s| s.name.as_str()),
            Some("Analysis Agent")
        );
        assert!(loaded.get_stage("missing").is_none());
    }

    #[test]
    fn test_stages_file_rejects_duplicate_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stages.json");
        fs::write(
            &path,
            r#"{"stages": [{"id": "a", "name": "A"}, {"id": "a", "name": "B"}]}"#,
        )
        .unwrap();

        let err = StagesFile::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate stage id 'a'"));
    }

    #[test]
    fn test_stages_file_rejects_empty_pipeline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stages.json");
        fs::write(&path, r#"{"stages": []}"#).unwrap();
        assert!(StagesFile::load(&path).is_err());
    }

    #[test]
    fn test_stages_file_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stages.json");
        fs::write(&path, "not json").unwrap();
        let err = StagesFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse stages JSON"));
    }

    #[test]
    fn test_load_stages_or_default_without_file() {
        let dir = tempdir().unwrap();
        let stages = load_stages_or_default(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(load_stages_or_default(None).unwrap().len(), 3);
    }

    #[test]
    fn test_load_stages_or_default_with_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stages.json");
        fs::write(
            &path,
            r#"{"stages": [{"id": "screen", "name": "Screening Agent"}]}"#,
        )
        .unwrap();
        let stages = load_stages_or_default(Some(&path)).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].id, "screen");
    }
}

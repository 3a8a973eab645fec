//! Configuration for finsight.
//!
//! Settings are layered: `.finsight/finsight.toml`, then environment
//! variables (optionally from a `.env` file), then command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:5000"
//! stage_path = "/api/agents/{stage}"
//! report_path = "/api/analyze"   # "" disables report synthesis
//! health_path = "/api/health"
//! timeout_secs = 300
//!
//! [report]
//! title = "Financial Analysis Report"
//! export_dir = "reports"
//!
//! [logging]
//! level = "warn"
//! json = false
//! file = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::service::{STAGE_PLACEHOLDER, ServiceEndpoints};
use crate::workflow::DEFAULT_REPORT_TITLE;

pub const CONFIG_DIR: &str = ".finsight";
pub const CONFIG_FILE: &str = "finsight.toml";

pub const ENV_BASE_URL: &str = "FINSIGHT_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "FINSIGHT_TIMEOUT_SECS";
pub const ENV_LOG: &str = "FINSIGHT_LOG";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Must contain `{stage}`
    #[serde(default = "default_stage_path")]
    pub stage_path: String,
    /// Empty disables synthesis; every report is then the fallback
    #[serde(default = "default_report_path")]
    pub report_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_stage_path() -> String {
    "/api/agents/{stage}".to_string()
}

fn default_report_path() -> String {
    "/api/analyze".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stage_path: default_stage_path(),
            report_path: default_report_path(),
            health_path: default_health_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_title")]
    pub title: String,
    /// Relative paths resolve against the project directory
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

fn default_title() -> String {
    DEFAULT_REPORT_TITLE.to_string()
}

fn default_export_dir() -> String {
    "reports".to_string()
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            export_dir: default_export_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Also write to `.finsight/logs/finsight.log`
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: false,
        }
    }
}

/// Contents of `finsight.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinsightToml {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl FinsightToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse finsight.toml")
    }

    /// Load `finsight.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize finsight.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides using `lookup` to read variables.
    /// Blank or unparsable values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.service.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|s| s.trim().parse().ok()) {
            self.service.timeout_secs = secs;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|l| !l.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = &self.service.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid base_url '{}': should start with http:// or https://",
                url
            ));
        }

        if !self.service.stage_path.contains(STAGE_PLACEHOLDER) {
            warnings.push(format!(
                "stage_path '{}' does not contain {}; every stage would call the same endpoint",
                self.service.stage_path, STAGE_PLACEHOLDER
            ));
        }

        if self.service.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; every request would time out immediately".to_string());
        }

        // Filter directives like "finsight=debug" are accepted as is.
        let level = self.logging.level.to_lowercase();
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(format!(
                "Unknown log level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        warnings
    }
}

/// Resolved runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: FinsightToml,
    /// CLI override: raise logging to debug
    pub verbose: bool,
    /// CLI override for the service base URL
    pub cli_base_url: Option<String>,
}

impl Config {
    /// Load `finsight.toml` under `project_dir` and apply process environment
    /// overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        Self::with_env(project_dir, |key| std::env::var(key).ok())
    }

    pub fn with_env<F>(project_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let mut toml = FinsightToml::load_or_default(&config_dir)?;
        toml.apply_env(lookup);

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            verbose: false,
            cli_base_url: None,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, verbose: bool, base_url: Option<String>) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_base_url = base_url;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn stages_file(&self) -> PathBuf {
        self.config_dir.join("stages.json")
    }

    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.project_dir.join(&self.toml.report.export_dir)
    }

    pub fn report_title(&self) -> &str {
        &self.toml.report.title
    }

    /// Base URL (CLI → env → file → default).
    pub fn base_url(&self) -> &str {
        self.cli_base_url
            .as_deref()
            .unwrap_or(&self.toml.service.base_url)
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        let service = &self.toml.service;
        let report_path = service.report_path.trim();
        ServiceEndpoints {
            base_url: self.base_url().to_string(),
            stage_path: service.stage_path.clone(),
            report_path: (!report_path.is_empty()).then(|| report_path.to_string()),
            health_path: service.health_path.clone(),
            timeout: Duration::from_secs(service.timeout_secs),
        }
    }

    /// Tracing filter directive: `debug` with `--verbose`, else the configured level.
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.toml.logging.level.clone()
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).context("Failed to create .finsight directory")?;
        if self.toml.logging.file {
            std::fs::create_dir_all(self.log_dir()).context("Failed to create log directory")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if let Some(url) = &self.cli_base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!(
                "Invalid --base-url '{}': should start with http:// or https://",
                url
            ));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = FinsightToml::parse("").unwrap();
        assert_eq!(toml, FinsightToml::default());
        assert_eq!(toml.service.base_url, "http://localhost:5000");
        assert_eq!(toml.service.timeout_secs, 300);
        assert_eq!(toml.report.title, "Financial Analysis Report");
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = FinsightToml::parse(
            r#"
[service]
base_url = "https://analysis.internal"
timeout_secs = 30

[logging]
json = true
"#,
        )
        .unwrap();
        assert_eq!(toml.service.base_url, "https://analysis.internal");
        assert_eq!(toml.service.timeout_secs, 30);
        assert_eq!(toml.service.stage_path, "/api/agents/{stage}");
        assert!(toml.logging.json);
        assert_eq!(toml.logging.level, "warn");
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        assert!(FinsightToml::parse("[service\nbase_url = 1").is_err());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let mut toml = FinsightToml::default();
        toml.service.base_url = "localhost:5000".to_string();
        toml.service.stage_path = "/api/agents".to_string();
        toml.service.timeout_secs = 0;
        toml.logging.level = "loud".to_string();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("base_url"));
        assert!(warnings[3].contains("loud"));
    }

    #[test]
    fn test_validate_accepts_filter_directives() {
        let mut toml = FinsightToml::default();
        toml.logging.level = "finsight=debug,reqwest=warn".to_string();
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://env:9000"),
            (ENV_TIMEOUT_SECS, "12"),
            (ENV_LOG, "debug"),
        ]
        .into_iter()
        .collect();
        let mut toml = FinsightToml::default();
        toml.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(toml.service.base_url, "http://env:9000");
        assert_eq!(toml.service.timeout_secs, 12);
        assert_eq!(toml.logging.level, "debug");
    }

    #[test]
    fn test_env_ignores_blank_and_unparsable() {
        let mut toml = FinsightToml::default();
        toml.apply_env(|k| match k {
            ENV_BASE_URL => Some("  ".to_string()),
            ENV_TIMEOUT_SECS => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(toml, FinsightToml::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = FinsightToml::default();
        toml.report.title = "Weekly Brief".to_string();
        toml.save(&path).unwrap();
        assert_eq!(FinsightToml::load(&path).unwrap(), toml);
    }

    #[test]
    fn test_config_paths_and_cli_override() {
        let dir = tempdir().unwrap();
        let mut config = Config::with_env(dir.path().to_path_buf(), no_env).unwrap();
        assert!(config.state_file().ends_with(".finsight/state"));
        assert!(config.stages_file().ends_with(".finsight/stages.json"));
        assert!(config.export_dir().ends_with("reports"));
        assert_eq!(config.base_url(), "http://localhost:5000");

        config.cli_base_url = Some("http://cli:1234".to_string());
        assert_eq!(config.endpoints().base_url, "http://cli:1234");
        assert_eq!(config.log_filter(), "warn");
        config.verbose = true;
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_config_reads_project_file() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join(CONFIG_FILE),
            "[service]\nreport_path = \"\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::with_env(dir.path().to_path_buf(), no_env).unwrap();
        let endpoints = config.endpoints();
        assert!(endpoints.report_path.is_none());
        assert_eq!(endpoints.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_missing_project_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(Config::with_env(dir.path().join("nope"), no_env).is_err());
    }
}

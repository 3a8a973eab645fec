use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use super::record::StageStatus;
use super::run::{RunEvent, RunObserver, WorkflowRun};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub run_id: String,
    pub stage_id: String,
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of stage transitions, one `run_id|stage_id|status|timestamp`
/// line each.
pub struct StateManager {
    state_file: PathBuf,
}

impl StateManager {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn save(&self, run_id: &str, stage_id: &str, status: StageStatus) -> Result<()> {
        let entry = format!(
            "{}|{}|{}|{}\n",
            run_id,
            stage_id,
            status,
            Utc::now().to_rfc3339()
        );

        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.state_file)
            .context("Failed to open state file")?
            .write_all(entry.as_bytes())
            .context("Failed to write state entry")?;

        Ok(())
    }

    /// All parseable entries in file order. Malformed lines are skipped.
    pub fn get_entries(&self) -> Result<Vec<StateEntry>> {
        if !self.state_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.state_file).context("Failed to read state file")?;

        let entries = content
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('|').collect();
                if parts.len() != 4 {
                    return None;
                }
                Some(StateEntry {
                    run_id: parts[0].to_string(),
                    stage_id: parts[1].to_string(),
                    status: parts[2].parse().ok()?,
                    timestamp: DateTime::parse_from_rfc3339(parts[3])
                        .ok()?
                        .with_timezone(&Utc),
                })
            })
            .collect();

        Ok(entries)
    }

    pub fn get_run_entries(&self, run_id: &str) -> Result<Vec<StateEntry>> {
        let entries = self.get_entries()?;
        Ok(entries.into_iter().filter(|e| e.run_id == run_id).collect())
    }

    /// Id of the run that wrote the most recent entry.
    pub fn last_run_id(&self) -> Result<Option<String>> {
        Ok(self.get_entries()?.pop().map(|e| e.run_id))
    }

    /// The stage that failed in the most recent run, if it failed.
    pub fn last_failed_stage(&self) -> Result<Option<String>> {
        let Some(run_id) = self.last_run_id()? else {
            return Ok(None);
        };
        Ok(self
            .get_run_entries(&run_id)?
            .into_iter()
            .rfind(|e| e.status == StageStatus::Failed)
            .map(|e| e.stage_id))
    }

    pub fn reset(&self) -> Result<()> {
        if self.state_file.exists() {
            fs::remove_file(&self.state_file).context("Failed to remove state file")?;
        }
        Ok(())
    }
}

impl RunObserver for StateManager {
    fn observe(&self, event: &RunEvent, run: &WorkflowRun) {
        let (stage_id, status) = match event {
            RunEvent::StageStarted { stage_id } => (stage_id, StageStatus::Running),
            RunEvent::StageCompleted { stage_id } => (stage_id, StageStatus::Completed),
            RunEvent::StageFailed { stage_id, .. } => (stage_id, StageStatus::Failed),
            _ => return,
        };
        if let Err(e) = self.save(&run.id().to_string(), stage_id, status) {
            warn!(error = %e, "failed to record stage transition");
        }
    }
}

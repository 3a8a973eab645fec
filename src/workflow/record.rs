use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::TransitionError;
use crate::stage::StageDefinition;

/// Lifecycle of a stage: `Pending → Running → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "running" => Ok(StageStatus::Running),
            "completed" => Ok(StageStatus::Completed),
            "failed" => Ok(StageStatus::Failed),
            other => Err(format!("unknown stage status '{}'", other)),
        }
    }
}

/// One stage's identity and lifecycle within a run.
///
/// `started_at` is set iff the status is not `Pending`; `ended_at` is set iff
/// the status is terminal. The transition methods are the only way to change
/// status and they keep both invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    id: String,
    name: String,
    description: String,
    status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
}

impl StageRecord {
    pub fn pending(definition: &StageDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            status: StageStatus::Pending,
            output: None,
            output_length: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Character count of `output`, cached when the output was recorded.
    pub fn output_length(&self) -> Option<usize> {
        self.output_length
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Wall-clock time between start and end, once the stage is terminal.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.ended_at? - self.started_at?)
    }

    fn check(&self, expected: StageStatus, to: StageStatus) -> Result<(), TransitionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TransitionError {
                stage_id: self.id.clone(),
                from: self.status,
                to,
            })
        }
    }

    fn set_output(&mut self, output: String) {
        self.output_length = Some(output.chars().count());
        self.output = Some(output);
    }

    /// `Pending → Running`.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check(StageStatus::Pending, StageStatus::Running)?;
        self.status = StageStatus::Running;
        self.started_at = Some(at);
        Ok(())
    }

    /// `Running → Completed` with the stage's output.
    pub fn complete(&mut self, output: String, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check(StageStatus::Running, StageStatus::Completed)?;
        self.status = StageStatus::Completed;
        self.set_output(output);
        self.ended_at = Some(at);
        Ok(())
    }

    /// `Running → Failed`; the output becomes an error description naming the stage.
    pub fn fail(&mut self, message: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check(StageStatus::Running, StageStatus::Failed)?;
        self.status = StageStatus::Failed;
        self.set_output(format!("{} failed: {}", self.name, message));
        self.ended_at = Some(at);
        Ok(())
    }
}

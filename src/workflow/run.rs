use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::ContextAccumulator;
use super::record::{StageRecord, StageStatus};
use crate::document::{Document, parse_document};
use crate::errors::TransitionError;
use crate::service::StageOutputs;
use crate::stage::StageDefinition;

/// The report a successful run ends with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Plain-text report, as exported by "download as text" consumers
    pub text: String,
    /// True when synthesis failed and the fallback template was used
    pub degraded: bool,
    /// Why synthesis failed, when `degraded`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl FinalReport {
    pub fn synthesized(text: String, generated_at: DateTime<Utc>) -> Self {
        Self {
            text,
            degraded: false,
            synthesis_error: None,
            generated_at,
        }
    }

    pub fn fallback(text: String, reason: String, generated_at: DateTime<Utc>) -> Self {
        Self {
            text,
            degraded: true,
            synthesis_error: Some(reason),
            generated_at,
        }
    }

    /// Parse the report text into sections and a table of contents.
    pub fn document(&self) -> Document {
        parse_document(&self.text)
    }
}

/// Coarse run state derived from the stages, report and error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No query submitted yet (or reset)
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
}

/// One end-to-end execution of the pipeline for a query.
///
/// Observers receive clones of this value after every transition, so a
/// snapshot never changes underneath them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    id: Uuid,
    query: String,
    stages: Vec<StageRecord>,
    cumulative_context: ContextAccumulator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_report: Option<FinalReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Create a run with every stage `Pending`, in definition order.
    pub fn new(query: &str, definitions: &[StageDefinition]) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            stages: definitions.iter().map(StageRecord::pending).collect(),
            cumulative_context: ContextAccumulator::new(),
            final_report: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Placeholder run published before any query has been submitted.
    pub fn idle() -> Self {
        Self::new("", &[])
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.id() == id)
    }

    /// The stage currently `Running`, if any.
    pub fn active_stage(&self) -> Option<&StageRecord> {
        self.stages
            .iter()
            .find(|s| s.status() == StageStatus::Running)
    }

    pub fn cumulative_context(&self) -> &str {
        self.cumulative_context.as_str()
    }

    pub fn has_context(&self) -> bool {
        !self.cumulative_context.is_empty()
    }

    pub fn final_report(&self) -> Option<&FinalReport> {
        self.final_report.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Number of completed stages and total stages.
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .stages
            .iter()
            .filter(|s| s.status() == StageStatus::Completed)
            .count();
        (done, self.stages.len())
    }

    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            RunStatus::Failed
        } else if self.final_report.is_some() {
            RunStatus::Completed
        } else if self.stages.is_empty() {
            RunStatus::Idle
        } else if self.stages.iter().all(|s| s.status() == StageStatus::Pending) {
            RunStatus::Pending
        } else {
            RunStatus::Running
        }
    }

    /// Outputs of all completed stages, in stage order.
    pub fn completed_outputs(&self) -> StageOutputs {
        let mut outputs = StageOutputs::new();
        for stage in &self.stages {
            if stage.status() == StageStatus::Completed
                && let Some(output) = stage.output()
            {
                outputs.insert(stage.id(), output);
            }
        }
        outputs
    }

    pub(crate) fn begin_stage(
        &mut self,
        index: usize,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.stages[index].start(at)
    }

    /// Complete a stage and fold its output into the cumulative context.
    pub(crate) fn complete_stage(
        &mut self,
        index: usize,
        output: String,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let stage = &mut self.stages[index];
        stage.complete(output, at)?;
        let name = stage.name().to_string();
        let output = stage.output().unwrap_or_default().to_string();
        self.cumulative_context.append(&name, &output);
        Ok(())
    }

    pub(crate) fn fail_stage(
        &mut self,
        index: usize,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.stages[index].fail(message, at)
    }

    /// Record the terminal error. Only the first call takes effect.
    pub(crate) fn set_error(&mut self, message: String, at: DateTime<Utc>) -> bool {
        if self.error.is_some() || self.final_report.is_some() {
            return false;
        }
        self.error = Some(message);
        self.finished_at = Some(at);
        true
    }

    /// Record the final report. Only the first call takes effect.
    pub(crate) fn set_final_report(&mut self, report: FinalReport) -> bool {
        if self.error.is_some() || self.final_report.is_some() {
            return false;
        }
        self.finished_at = Some(report.generated_at);
        self.final_report = Some(report);
        true
    }
}

/// What just happened to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunStarted,
    StageStarted { stage_id: String },
    StageCompleted { stage_id: String },
    StageFailed { stage_id: String, message: String },
    ReportAssembled { degraded: bool },
    RunFailed { message: String },
    Reset,
}

/// Receives every transition of a run together with the updated run.
pub trait RunObserver: Send + Sync {
    fn observe(&self, event: &RunEvent, run: &WorkflowRun);
}

/// Fans one notification out to several observers, in registration order.
#[derive(Default, Clone)]
pub struct Observers {
    inner: Vec<std::sync::Arc<dyn RunObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: std::sync::Arc<dyn RunObserver>) {
        self.inner.push(observer);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl RunObserver for Observers {
    fn observe(&self, event: &RunEvent, run: &WorkflowRun) {
        for observer in &self.inner {
            observer.observe(event, run);
        }
    }
}

impl RunObserver for tokio::sync::watch::Sender<WorkflowRun> {
    fn observe(&self, _event: &RunEvent, run: &WorkflowRun) {
        self.send_replace(run.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::get_default_stages;

    fn new_run() -> WorkflowRun {
        WorkflowRun::new("Analyze Apple", &get_default_stages())
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = new_run();
        assert_eq!(run.status(), RunStatus::Pending);
        assert_eq!(run.stages().len(), 3);
        assert_eq!(run.progress(), (0, 3));
        assert!(!run.has_context());
        assert!(run.final_report().is_none());
        assert!(run.error().is_none());
    }

    #[test]
    fn test_idle_run() {
        let run = WorkflowRun::idle();
        assert_eq!(run.status(), RunStatus::Idle);
        assert!(run.active_stage().is_none());
    }

    #[test]
    fn test_complete_stage_appends_context() {
        let mut run = new_run();
        run.begin_stage(0, Utc::now()).unwrap();
        assert_eq!(run.status(), RunStatus::Running);
        assert_eq!(run.active_stage().map(|s| s.id()), Some("research"));

        run.complete_stage(0, "facts".to_string(), Utc::now()).unwrap();
        assert_eq!(
            run.cumulative_context(),
            "\n\n=== Research Agent Output ===\nfacts"
        );
        assert_eq!(run.progress(), (1, 3));
        assert_eq!(run.completed_outputs().get("research"), Some("facts"));
    }

    #[test]
    fn test_failed_stage_does_not_touch_context() {
        let mut run = new_run();
        run.begin_stage(0, Utc::now()).unwrap();
        run.fail_stage(0, "timeout", Utc::now()).unwrap();
        assert!(!run.has_context());
        assert!(run.completed_outputs().is_empty());
    }

    #[test]
    fn test_error_and_report_are_set_once_and_exclusive() {
        let mut run = new_run();
        assert!(run.set_error("first".to_string(), Utc::now()));
        assert!(!run.set_error("second".to_string(), Utc::now()));
        assert!(!run.set_final_report(FinalReport::synthesized(
            "report".to_string(),
            Utc::now()
        )));
        assert_eq!(run.error(), Some("first"));
        assert!(run.final_report().is_none());
        assert_eq!(run.status(), RunStatus::Failed);
        assert!(run.finished_at().is_some());
    }

    #[test]
    fn test_final_report_marks_completed() {
        let mut run = new_run();
        assert!(run.set_final_report(FinalReport::synthesized(
            "# Summary".to_string(),
            Utc::now()
        )));
        assert_eq!(run.status(), RunStatus::Completed);
        let doc = run.final_report().unwrap().document();
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn test_watch_sender_observer_publishes_clone() {
        let (tx, rx) = tokio::sync::watch::channel(WorkflowRun::idle());
        let run = new_run();
        tx.observe(&RunEvent::RunStarted, &run);
        assert_eq!(rx.borrow().id(), run.id());
        assert_eq!(rx.borrow().query(), "Analyze Apple");
    }

    #[test]
    fn test_run_serializes_to_json() {
        let run = new_run();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["query"], "Analyze Apple");
        assert_eq!(json["stages"][0]["status"], "pending");
        assert_eq!(json["cumulative_context"], "");
        assert!(json.get("final_report").is_none());
    }
}

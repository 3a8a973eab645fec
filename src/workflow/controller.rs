use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use super::assembler::ReportAssembler;
use super::run::{Observers, RunEvent, RunObserver, WorkflowRun};
use super::sequencer::StageSequencer;
use crate::errors::WorkflowError;
use crate::service::{ReportSynthesizer, StageInvoker};
use crate::stage::StageDefinition;

/// Runs a query end to end: every stage in order, then the report.
///
/// The current run is published through a `watch` channel after every
/// transition; see [`WorkflowController::subscribe`].
pub struct WorkflowController {
    sequencer: StageSequencer,
    assembler: ReportAssembler,
    observers: Observers,
    current: watch::Sender<WorkflowRun>,
}

impl WorkflowController {
    pub fn new(sequencer: StageSequencer, assembler: ReportAssembler) -> Self {
        let (current, _) = watch::channel(WorkflowRun::idle());
        Self {
            sequencer,
            assembler,
            observers: Observers::new(),
            current,
        }
    }

    /// Controller whose stages and synthesis all go to one service.
    pub fn for_service<S>(service: Arc<S>, stages: Vec<StageDefinition>) -> Self
    where
        S: StageInvoker + ReportSynthesizer + 'static,
    {
        let sequencer = StageSequencer::from_definitions(stages.clone(), service.clone());
        let assembler = ReportAssembler::new(service, stages);
        Self::new(sequencer, assembler)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.assembler = self.assembler.with_title(title);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowRun> {
        self.current.subscribe()
    }

    /// Clone of the latest published run.
    pub fn snapshot(&self) -> WorkflowRun {
        self.current.borrow().clone()
    }

    fn fanout(&self) -> Fanout<'_> {
        Fanout {
            current: &self.current,
            observers: &self.observers,
        }
    }

    fn publish(&self, event: RunEvent, run: &WorkflowRun) {
        self.fanout().observe(&event, run);
    }

    /// Execute a full run for `query`.
    ///
    /// A blank query is rejected before any run is created. A stage failure
    /// stops the run and is returned as the error, with the failed run left
    /// in the snapshot. Synthesis failures never fail the run.
    pub async fn run(&mut self, query: &str) -> Result<WorkflowRun, WorkflowError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WorkflowError::EmptyQuery);
        }

        let mut run = self.sequencer.new_run(query);
        info!(run_id = %run.id(), stages = run.stages().len(), "workflow started");
        self.publish(RunEvent::RunStarted, &run);

        let outputs = match self.sequencer.run(&mut run, &self.fanout()).await {
            Ok(outputs) => outputs,
            Err(err) => {
                let message = err.to_string();
                run.set_error(message.clone(), Utc::now());
                error!(run_id = %run.id(), error = %message, "workflow failed");
                self.publish(RunEvent::RunFailed { message }, &run);
                return Err(err);
            }
        };

        let report = self.assembler.assemble(run.query(), &outputs).await;
        let degraded = report.degraded;
        run.set_final_report(report);
        info!(run_id = %run.id(), degraded, "workflow completed");
        self.publish(RunEvent::ReportAssembled { degraded }, &run);

        Ok(run)
    }

    /// Discard the current run and go back to idle.
    pub fn reset(&mut self) {
        let idle = WorkflowRun::idle();
        self.publish(RunEvent::Reset, &idle);
    }
}

/// Borrowed view of the controller's sinks, handed to the sequencer while the
/// controller itself is mutably borrowed.
struct Fanout<'a> {
    current: &'a watch::Sender<WorkflowRun>,
    observers: &'a Observers,
}

impl RunObserver for Fanout<'_> {
    fn observe(&self, event: &RunEvent, run: &WorkflowRun) {
        self.current.observe(event, run);
        self.observers.observe(event, run);
    }
}

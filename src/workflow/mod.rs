//! The analysis pipeline: stage lifecycle, context handoff, report assembly
//! and the controller tying them into one observable run.

pub mod assembler;
pub mod context;
pub mod controller;
pub mod record;
pub mod run;
pub mod sequencer;
pub mod state;

pub use assembler::{DEFAULT_REPORT_TITLE, ReportAssembler, fallback_report};
pub use context::ContextAccumulator;
pub use controller::WorkflowController;
pub use record::{StageRecord, StageStatus};
pub use run::{FinalReport, Observers, RunEvent, RunObserver, RunStatus, WorkflowRun};
pub use sequencer::{BoundStage, StageSequencer};
pub use state::{StateEntry, StateManager};

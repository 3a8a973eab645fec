//! Typed error hierarchy for finsight.
//!
//! Three enums cover the boundaries the workflow core cares about:
//! - `ServiceError`: a capability call (stage or synthesis) failed
//! - `WorkflowError`: a run terminated abnormally
//! - `TransitionError`: a stage lifecycle edge outside the state machine

use thiserror::Error;

use crate::workflow::StageStatus;

/// Failure of a single call to the analysis service.
///
/// Both transport failures and explicit `success: false` responses land here,
/// so callers handle one `Result` shape regardless of why a call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Service reported failure: {0}")]
    Unsuccessful(String),

    #[error("Failed to decode service response: {0}")]
    Decode(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

/// Errors that terminate a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Query is required")]
    EmptyQuery,

    #[error("Stage '{stage_id}' ({stage_name}) failed: {message}")]
    StageFailed {
        stage_id: String,
        stage_name: String,
        message: String,
    },

    #[error("Run stages {run:?} do not match sequencer stages {expected:?}")]
    RunMismatch {
        expected: Vec<String>,
        run: Vec<String>,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl WorkflowError {
    /// Id of the stage that failed, if this is a stage failure.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            WorkflowError::StageFailed { stage_id, .. } => Some(stage_id),
            _ => None,
        }
    }
}

/// A stage was asked to move along an edge the lifecycle does not have.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage '{stage_id}' cannot move from {from} to {to}")]
pub struct TransitionError {
    pub stage_id: String,
    pub from: StageStatus,
    pub to: StageStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failed_message_names_the_stage() {
        let err = WorkflowError::StageFailed {
            stage_id: "analysis".into(),
            stage_name: "Analysis Agent".into(),
            message: "Service reported failure: model overloaded".into(),
        };
        let text = err.to_string();
        assert!(text.contains("'analysis'"));
        assert!(text.contains("Analysis Agent"));
        assert!(text.contains("model overloaded"));
        assert_eq!(err.failed_stage(), Some("analysis"));
    }

    #[test]
    fn empty_query_has_no_failed_stage() {
        let err = WorkflowError::EmptyQuery;
        assert_eq!(err.to_string(), "Query is required");
        assert!(err.failed_stage().is_none());
    }

    #[test]
    fn workflow_error_converts_from_transition_error() {
        let inner = TransitionError {
            stage_id: "research".into(),
            from: StageStatus::Completed,
            to: StageStatus::Running,
        };
        let err: WorkflowError = inner.clone().into();
        match &err {
            WorkflowError::Transition(t) => assert_eq!(t, &inner),
            _ => panic!("Expected WorkflowError::Transition"),
        }
        assert!(err.to_string().contains("completed to running"));
    }

    #[test]
    fn service_error_status_carries_code() {
        let err = ServiceError::Status {
            status: 503,
            message: "unavailable".into(),
        };
        match &err {
            ServiceError::Status { status, .. } => assert_eq!(*status, 503),
            _ => panic!("Expected Status"),
        }
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ServiceError::Transport("refused".into()));
        assert_std_error(&WorkflowError::EmptyQuery);
        assert_std_error(&TransitionError {
            stage_id: "x".into(),
            from: StageStatus::Pending,
            to: StageStatus::Completed,
        });
    }
}

//! Capability contracts for the remote analysis service.
//!
//! The workflow core only ever talks to these traits:
//! - `StageInvoker`: run one named stage with the query and accumulated context
//! - `ReportSynthesizer`: fold all stage outputs into one report
//!
//! `HttpAnalysisService` implements both against the JSON endpoints of the
//! analysis backend. Tests substitute in-memory doubles.

mod http;

pub use http::{HttpAnalysisService, STAGE_PLACEHOLDER, ServiceEndpoints};

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::ServiceError;

/// Invokes a single analysis stage.
#[async_trait]
pub trait StageInvoker: Send + Sync {
    async fn invoke(&self, stage_id: &str, query: &str, context: &str)
    -> Result<String, ServiceError>;
}

/// Synthesizes the comprehensive report from all stage outputs.
#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, outputs: &StageOutputs)
    -> Result<String, ServiceError>;
}

/// Synthesizer for deployments without a synthesis endpoint.
///
/// Always reports the capability as unavailable, so the assembler goes
/// straight to the fallback report.
pub struct NoSynthesis;

#[async_trait]
impl ReportSynthesizer for NoSynthesis {
    async fn synthesize(&self, _query: &str, _outputs: &StageOutputs) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable(
            "no report synthesis endpoint configured".to_string(),
        ))
    }
}

/// Completed stage outputs keyed by stage id, in execution order.
///
/// Serializes as a flat JSON object (`{"research": "...", ...}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutputs {
    entries: Vec<(String, String)>,
}

impl StageOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the output for a stage, keeping first-insertion order.
    pub fn insert(&mut self, stage_id: impl Into<String>, output: impl Into<String>) {
        let stage_id = stage_id.into();
        let output = output.into();
        match self.entries.iter_mut().find(|(id, _)| *id == stage_id) {
            Some(entry) => entry.1 = output,
            None => self.entries.push((stage_id, output)),
        }
    }

    pub fn get(&self, stage_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _)| id == stage_id)
            .map(|(_, output)| output.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, out)| (id.as_str(), out.as_str()))
    }
}

impl Serialize for StageOutputs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, output) in &self.entries {
            map.serialize_entry(id, output)?;
        }
        map.end()
    }
}

use serde::{Deserialize, Serialize};

/// Growing context handed from stage to stage.
///
/// Only ever appended to: each completed stage contributes a
/// `=== {name} Output ===` block in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextAccumulator {
    text: String,
}

impl ContextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed stage's output under its name header.
    pub fn append(&mut self, stage_name: &str, output: &str) {
        self.text.push_str(&format!(
            "\n\n=== {} Output ===\n{}",
            stage_name, output
        ));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use super::run::{RunEvent, RunObserver, WorkflowRun};
use crate::errors::{ServiceError, WorkflowError};
use crate::service::{StageInvoker, StageOutputs};
use crate::stage::StageDefinition;

/// A stage together with the capability that runs it.
#[derive(Clone)]
pub struct BoundStage {
    pub definition: StageDefinition,
    invoker: Arc<dyn StageInvoker>,
}

impl BoundStage {
    pub fn new(definition: StageDefinition, invoker: Arc<dyn StageInvoker>) -> Self {
        Self {
            definition,
            invoker,
        }
    }

    pub async fn invoke(&self, query: &str, context: &str) -> Result<String, ServiceError> {
        self.invoker
            .invoke(&self.definition.id, query, context)
            .await
    }
}

/// Runs stages strictly one after another, stopping at the first failure.
pub struct StageSequencer {
    stages: Vec<BoundStage>,
}

impl StageSequencer {
    pub fn new(stages: Vec<BoundStage>) -> Self {
        Self { stages }
    }

    /// Bind every definition to the same invoker.
    pub fn from_definitions(definitions: Vec<StageDefinition>, invoker: Arc<dyn StageInvoker>) -> Self {
        Self::new(
            definitions
                .into_iter()
                .map(|d| BoundStage::new(d, Arc::clone(&invoker)))
                .collect(),
        )
    }

    pub fn definitions(&self) -> Vec<StageDefinition> {
        self.stages.iter().map(|s| s.definition.clone()).collect()
    }

    /// A fresh run whose stage records line up with this sequencer's stages.
    pub fn new_run(&self, query: &str) -> WorkflowRun {
        WorkflowRun::new(query, &self.definitions())
    }

    /// Execute every stage of `run` in order.
    ///
    /// Each stage sees the cumulative context of all stages before it. On the
    /// first failure the stage is marked `Failed` and the error is returned;
    /// later stages stay `Pending`. `run` must come from [`Self::new_run`];
    /// a run with different stage ids is rejected before anything executes.
    pub async fn run(
        &self,
        run: &mut WorkflowRun,
        observer: &dyn RunObserver,
    ) -> Result<StageOutputs, WorkflowError> {
        let run_ids: Vec<&str> = run.stages().iter().map(|s| s.id()).collect();
        let expected: Vec<&str> = self.stages.iter().map(|s| s.definition.id.as_str()).collect();
        if run_ids != expected {
            return Err(WorkflowError::RunMismatch {
                expected: expected.into_iter().map(String::from).collect(),
                run: run_ids.into_iter().map(String::from).collect(),
            });
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let stage_id = stage.definition.id.clone();

            run.begin_stage(index, Utc::now())?;
            info!(run_id = %run.id(), stage = %stage_id, "stage started");
            observer.observe(
                &RunEvent::StageStarted {
                    stage_id: stage_id.clone(),
                },
                run,
            );

            let context = run.cumulative_context().to_string();
            match stage.invoke(run.query(), &context).await {
                Ok(output) => {
                    let chars = output.chars().count();
                    run.complete_stage(index, output, Utc::now())?;
                    info!(run_id = %run.id(), stage = %stage_id, chars, "stage completed");
                    observer.observe(&RunEvent::StageCompleted { stage_id }, run);
                }
                Err(err) => {
                    let message = err.to_string();
                    run.fail_stage(index, &message, Utc::now())?;
                    error!(run_id = %run.id(), stage = %stage_id, error = %message, "stage failed");
                    observer.observe(
                        &RunEvent::StageFailed {
                            stage_id: stage_id.clone(),
                            message: message.clone(),
                        },
                        run,
                    );
                    return Err(WorkflowError::StageFailed {
                        stage_id,
                        stage_name: stage.definition.name.clone(),
                        message,
                    });
                }
            }
        }

        Ok(run.completed_outputs())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stage invoker shared by the workflow tests.

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers each stage from a script and records every call.
    #[derive(Default)]
    pub struct ScriptedInvoker {
        responses: HashMap<String, Result<String, ServiceError>>,
        pub calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedInvoker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ok(mut self, stage_id: &str, output: &str) -> Self {
            self.responses
                .insert(stage_id.to_string(), Ok(output.to_string()));
            self
        }

        pub fn err(mut self, stage_id: &str, err: ServiceError) -> Self {
            self.responses.insert(stage_id.to_string(), Err(err));
            self
        }

        pub fn called_stages(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(id, _, _)| id.clone())
                .collect()
        }

        pub fn context_for(&self, stage_id: &str) -> Option<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _, _)| id == stage_id)
                .map(|(_, _, ctx)| ctx.clone())
        }
    }

    #[async_trait]
    impl StageInvoker for ScriptedInvoker {
        async fn invoke(
            &self,
            stage_id: &str,
            query: &str,
            context: &str,
        ) -> Result<String, ServiceError> {
            self.calls.lock().unwrap().push((
                stage_id.to_string(),
                query.to_string(),
                context.to_string(),
            ));
            self.responses
                .get(stage_id)
                .cloned()
                .unwrap_or_else(|| Err(ServiceError::Unavailable(format!("no script for {}", stage_id))))
        }
    }

    /// Records every event it sees along with the run status at that moment.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<(RunEvent, WorkflowRun)>>,
    }

    impl RunObserver for RecordingObserver {
        fn observe(&self, event: &RunEvent, run: &WorkflowRun) {
            self.events.lock().unwrap().push((event.clone(), run.clone()));
        }
    }
}

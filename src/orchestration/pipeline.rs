//! # Step Pipeline
//!
//! Runs an ordered list of steps for one task and keeps its audit trail in sync:
//!
//! 1. append `Start <name>`
//! 2. execute steps in order, appending each step's description
//! 3. stop at the first failing step
//! 4. append `End <name>` and finalize the task as `completed` or `failed`
//!
//! Step failures are recorded, never propagated. A persistence fault aborts the
//! run: the pipeline makes one best-effort attempt to mark the task `failed` and
//! returns the fault that aborted it.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::errors::PipelineError;
use super::step::Step;
use crate::constants::markers;
use crate::logging::{log_error, log_step_operation, log_task_operation};
use crate::models::Task;
use crate::state_machine::{TaskEvent, TaskStateMachine, TaskStatus};
use crate::store::TaskStore;

/// Result of a run that reached finalization
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub task: Task,
    pub steps_executed: usize,
    /// Name of the step that stopped the run, if any
    pub failed_step: Option<&'static str>,
}

impl PipelineOutcome {
    pub fn status(&self) -> TaskStatus {
        self.task.status
    }
}

#[derive(Debug)]
pub struct StepPipeline {
    name: String,
    steps: Vec<Step>,
}

impl StepPipeline {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Execute every step for `task_id` and finalize the task
    #[instrument(
        skip(self, store),
        fields(pipeline = %self.name, steps = self.steps.len(), run_id = tracing::field::Empty)
    )]
    pub async fn run(
        self,
        task_id: i64,
        store: Arc<dyn TaskStore>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        match self.execute(task_id, run_id, store.as_ref()).await {
            Ok(outcome) => {
                log_task_operation(
                    "finalize",
                    Some(task_id),
                    Some(&self.name),
                    outcome.task.status.as_str(),
                    outcome.failed_step,
                );
                Ok(outcome)
            }
            Err(err) => {
                log_error(
                    "pipeline",
                    "run",
                    &err.to_string(),
                    Some(&format!("task_id={task_id} run_id={run_id}")),
                );
                self.abandon(task_id, store.as_ref()).await;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        task_id: i64,
        run_id: Uuid,
        store: &dyn TaskStore,
    ) -> Result<PipelineOutcome, PipelineError> {
        let persist = |source| PipelineError::Persistence { task_id, source };

        store
            .append_message(task_id, &format!("{} {}", markers::START, self.name))
            .await
            .map_err(persist)?;

        let mut steps_executed = 0;
        let mut failed_step = None;

        for (index, step) in self.steps.iter().enumerate() {
            steps_executed += 1;
            let description = match step.execute().await {
                Ok(outcome) => {
                    log_step_operation("execute", task_id, index, step.name(), "ok", None);
                    outcome.description
                }
                Err(err) => {
                    log_step_operation(
                        "execute",
                        task_id,
                        index,
                        step.name(),
                        "failed",
                        Some(&err.garage_error().to_string()),
                    );
                    failed_step = Some(step.name());
                    err.description().to_string()
                }
            };

            store
                .append_message(task_id, &description)
                .await
                .map_err(persist)?;

            if failed_step.is_some() {
                break;
            }
        }

        store
            .append_message(task_id, &format!("{} {}", markers::END, self.name))
            .await
            .map_err(persist)?;

        let event = match failed_step {
            Some(step) => TaskEvent::Fail(format!("step {step} failed")),
            None => TaskEvent::Complete,
        };
        let target = TaskStateMachine::determine_target_state(TaskStatus::InProgress, &event)
            .unwrap_or(TaskStatus::Failed);

        let task = store.finalize_task(task_id, target).await.map_err(persist)?;

        info!(
            task_id,
            status = %task.status,
            steps_executed,
            "Pipeline run finished"
        );

        Ok(PipelineOutcome {
            run_id,
            task,
            steps_executed,
            failed_step,
        })
    }

    /// One attempt to leave the task in `failed` after an aborted run
    async fn abandon(&self, task_id: i64, store: &dyn TaskStore) {
        if let Err(err) = store.finalize_task(task_id, TaskStatus::Failed).await {
            warn!(task_id, error = %err, "Could not mark aborted task as failed");
        }
    }
}

//! # Garage Task Service
//!
//! Entry point for triggering workflows and reading their audit trail.
//!
//! Triggering creates the task record synchronously, hands the pipeline run to
//! the dispatcher and returns the `in_progress` task. The run itself happens in
//! the background and is observable only through the store.

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, warn};

use super::dispatcher::Dispatcher;
use super::errors::{WorkflowError, WorkflowResult};
use super::pipeline::StepPipeline;
use super::step::StepFactory;
use super::workflow::Workflow;
use crate::constants::workflow_names::PROBLEM_ARG;
use crate::garage::GarageClient;
use crate::logging::log_task_operation;
use crate::models::{Car, Message, NewTask, Page, Task, TaskWithMessages};
use crate::resilience::RetryPolicy;
use crate::store::TaskStore;

pub struct GarageTaskService {
    client: Arc<dyn GarageClient>,
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<dyn Dispatcher>,
    steps: StepFactory,
}

impl GarageTaskService {
    pub fn new(
        client: Arc<dyn GarageClient>,
        store: Arc<dyn TaskStore>,
        dispatcher: Arc<dyn Dispatcher>,
        retry: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        let steps = StepFactory::new(Arc::clone(&client), retry, call_timeout);
        Self {
            client,
            store,
            dispatcher,
            steps,
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Resolve `workflow_name` and start it for `car_id`
    #[instrument(skip(self, extra_args))]
    pub async fn trigger_workflow(
        &self,
        workflow_name: &str,
        car_id: &str,
        extra_args: &HashMap<String, String>,
    ) -> WorkflowResult<Task> {
        let workflow = Workflow::from_request(workflow_name, extra_args)?;
        self.start(workflow, car_id).await
    }

    pub async fn check_car(&self, car_id: &str) -> WorkflowResult<Task> {
        self.start(Workflow::Check, car_id).await
    }

    pub async fn send_for_repair(&self, car_id: &str, problem: &str) -> WorkflowResult<Task> {
        let workflow = Workflow::SendForRepair {
            problem: problem.to_string(),
        };
        self.start(workflow, car_id).await
    }

    pub async fn send_to_parking(&self, car_id: &str) -> WorkflowResult<Task> {
        self.start(Workflow::SendToParking, car_id).await
    }

    /// Create the task record and schedule its pipeline run
    pub async fn start(&self, workflow: Workflow, car_id: &str) -> WorkflowResult<Task> {
        if car_id.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument {
                argument: "car_id",
                reason: "must not be empty".to_string(),
            });
        }
        if let Workflow::SendForRepair { problem } = &workflow {
            if problem.trim().is_empty() {
                return Err(WorkflowError::InvalidArgument {
                    argument: PROBLEM_ARG,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        let name = workflow.task_name(car_id);
        let task = self.store.create_task(NewTask::new(&name, car_id)).await?;
        let task_id = task.task_id;

        let pipeline = StepPipeline::new(name, workflow.steps(car_id, &self.steps));
        let store = Arc::clone(&self.store);
        let job = async move {
            if let Err(err) = pipeline.run(task_id, store).await {
                error!(task_id, error = %err, "Pipeline run aborted");
            }
        }
        .boxed();

        if let Err(err) = self.dispatcher.schedule(task_id, job) {
            // The record stays in_progress; no run will ever finalize it.
            warn!(task_id, error = %err, "Task created but its run could not be scheduled");
            return Err(err.into());
        }

        log_task_operation(
            "trigger",
            Some(task_id),
            Some(&task.name),
            task.status.as_str(),
            Some(workflow.kind()),
        );
        Ok(task)
    }

    /// A task together with its full audit trail
    pub async fn task(&self, task_id: i64) -> WorkflowResult<TaskWithMessages> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(WorkflowError::TaskNotFound { task_id })?;

        let mut messages: Vec<Message> = Vec::new();
        loop {
            let page = Page::new(messages.len() as u32, Page::default().limit());
            let batch = self.store.task_messages(task_id, page).await?;
            let done = (batch.len() as u32) < page.limit();
            messages.extend(batch);
            if done {
                break;
            }
        }

        Ok(TaskWithMessages { task, messages })
    }

    pub async fn tasks(&self, page: Page) -> WorkflowResult<Vec<Task>> {
        Ok(self.store.list_tasks(page).await?)
    }

    pub async fn messages(&self, page: Page) -> WorkflowResult<Vec<Message>> {
        Ok(self.store.list_messages(page).await?)
    }

    pub async fn cars(&self) -> WorkflowResult<Vec<Car>> {
        Ok(self.client.list_cars().await?)
    }
}

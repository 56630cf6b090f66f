//! Error types for step execution, pipeline runs and workflow triggering.
//!
//! Step failures never escape a run: the pipeline records them and finalizes the
//! task as `failed`. Only persistence faults end a run with a `PipelineError`,
//! and only caller mistakes or scheduling faults surface from `WorkflowError`.

use thiserror::Error;

use super::dispatcher::SchedulingError;
use crate::garage::GarageClientError;
use crate::store::PersistenceError;

/// A step that did not produce an outcome
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Single garage call failed (not found, transient failure or timeout)
    #[error("{description}")]
    Failed {
        description: String,
        #[source]
        source: GarageClientError,
    },

    /// Every attempt of a retried call failed
    #[error("{description}")]
    RetryExhausted {
        description: String,
        attempts: u32,
        #[source]
        source: GarageClientError,
    },
}

impl StepError {
    /// Audit message recorded for this failure
    pub fn description(&self) -> &str {
        match self {
            Self::Failed { description, .. } | Self::RetryExhausted { description, .. } => {
                description
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Failed { .. } => 1,
            Self::RetryExhausted { attempts, .. } => *attempts,
        }
    }

    pub fn garage_error(&self) -> &GarageClientError {
        match self {
            Self::Failed { source, .. } | Self::RetryExhausted { source, .. } => source,
        }
    }
}

/// Fatal fault that ended a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Persistence failed during run of task {task_id}: {source}")]
    Persistence {
        task_id: i64,
        #[source]
        source: PersistenceError,
    },
}

impl PipelineError {
    pub fn task_id(&self) -> i64 {
        match self {
            Self::Persistence { task_id, .. } => *task_id,
        }
    }
}

/// Errors surfaced synchronously to whoever triggers or reads workflows
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unknown workflow: {name}")]
    UnknownWorkflow { name: String },

    #[error("Workflow {workflow} requires argument '{argument}'")]
    MissingArgument {
        workflow: &'static str,
        argument: &'static str,
    },

    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    #[error("Task with id={task_id} not found")]
    TaskNotFound { task_id: i64 },

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Garage(#[from] GarageClientError),
}

impl WorkflowError {
    /// True when the request itself was wrong
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownWorkflow { .. }
                | Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::TaskNotFound { .. }
        )
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

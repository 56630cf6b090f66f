//! # Orchestration
//!
//! Turns a workflow request into a task record plus a background pipeline run.
//!
//! - [`workflow`]: named workflows and their step lists
//! - [`step`]: a single bounded garage call, optionally retried
//! - [`pipeline`]: ordered step execution with audit messages and finalization
//! - [`dispatcher`]: background execution with one active run per task
//! - [`service`]: trigger and read-side facade
//! - [`bootstrap`]: configuration to running engine

pub mod bootstrap;
pub mod dispatcher;
pub mod errors;
pub mod pipeline;
pub mod service;
pub mod step;
pub mod workflow;

pub use bootstrap::GarageSystem;
pub use dispatcher::{Dispatcher, PipelineJob, SchedulingError, TokioDispatcher};
pub use errors::{PipelineError, StepError, WorkflowError, WorkflowResult};
pub use pipeline::{PipelineOutcome, StepPipeline};
pub use service::GarageTaskService;
pub use step::{GarageAction, Step, StepFactory, StepOutcome};
pub use workflow::Workflow;

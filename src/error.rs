//! Error types for the garage task engine.
//!
//! Each subsystem owns a focused error enum; `GarageError` is the crate-wide
//! umbrella that callers outside the engine usually match on.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::garage::GarageClientError;
use crate::orchestration::dispatcher::SchedulingError;
use crate::orchestration::errors::{PipelineError, WorkflowError};
use crate::store::PersistenceError;

#[derive(Debug, Error)]
pub enum GarageError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Garage client error: {0}")]
    GarageClient(#[from] GarageClientError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl GarageError {
    /// True when the error reflects bad caller input rather than a system fault
    pub fn is_caller_error(&self) -> bool {
        match self {
            Self::Workflow(err) => err.is_caller_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GarageError>;

use thiserror::Error;

/// Errors raised when a lifecycle transition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Invalid task status: {0}")]
    InvalidStatus(String),
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;

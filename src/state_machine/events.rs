use serde::{Deserialize, Serialize};

use super::states::TaskStatus;

/// Events that can trigger task status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Every step of the run succeeded
    Complete,
    /// The run stopped on a failed step
    Fail(String),
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            Self::Complete => None,
        }
    }

    /// Event that drives a task into the given terminal status
    pub fn for_status(status: TaskStatus, reason: impl Into<String>) -> Option<Self> {
        match status {
            TaskStatus::Completed => Some(Self::Complete),
            TaskStatus::Failed => Some(Self::Fail(reason.into())),
            TaskStatus::InProgress => None,
        }
    }
}

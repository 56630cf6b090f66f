use tracing::debug;

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::TaskStatus,
};

/// Transition table for task records
///
/// `in_progress` is the only non-terminal status, so a task moves at most once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Determine the target status based on current status and event
    pub fn determine_target_state(
        current: TaskStatus,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskStatus> {
        let target = match (current, event) {
            (TaskStatus::InProgress, TaskEvent::Complete) => TaskStatus::Completed,
            (TaskStatus::InProgress, TaskEvent::Fail(_)) => TaskStatus::Failed,
            (from, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        debug!(
            from = %current,
            to = %target,
            event = event.event_type(),
            reason = event.error_message(),
            "Task transition accepted"
        );

        Ok(target)
    }

    /// Validate that `current` may be finalized as `target`
    pub fn finalize(current: TaskStatus, target: TaskStatus) -> StateMachineResult<TaskStatus> {
        let event = TaskEvent::for_status(target, "pipeline failure").ok_or_else(|| {
            StateMachineError::InvalidTransition {
                from: current.to_string(),
                event: format!("finalize to {target}"),
            }
        })?;
        Self::determine_target_state(current, &event)
    }
}

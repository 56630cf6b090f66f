// Task lifecycle state machine
//
// A task is created `in_progress` and moves exactly once to a terminal status.
// Stores consult the transition table before persisting a final status.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_state_machine;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use states::TaskStatus;
pub use task_state_machine::TaskStateMachine;

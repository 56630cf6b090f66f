use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{PersistenceError, PersistenceResult, TaskStore};
use crate::models::{Message, NewTask, Page, Task};
use crate::state_machine::{TaskStateMachine, TaskStatus};

#[derive(Debug, Default)]
struct StoreState {
    tasks: Vec<Task>,
    messages: Vec<Message>,
}

/// Process-local store; ids are dense and start at 1 like an autoincrement column
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    state: RwLock<StoreState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, new_task: NewTask) -> PersistenceResult<Task> {
        let mut state = self.state.write();
        let task = Task::from_new(state.tasks.len() as i64 + 1, new_task, Utc::now());
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn append_message(&self, task_id: i64, body: &str) -> PersistenceResult<Message> {
        let mut state = self.state.write();
        if !state.tasks.iter().any(|t| t.task_id == task_id) {
            return Err(PersistenceError::TaskNotFound { task_id });
        }
        let message = Message {
            message_id: state.messages.len() as i64 + 1,
            task_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn finalize_task(&self, task_id: i64, status: TaskStatus) -> PersistenceResult<Task> {
        let mut state = self.state.write();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or(PersistenceError::TaskNotFound { task_id })?;

        task.status = TaskStateMachine::finalize(task.status, status)
            .map_err(|source| PersistenceError::InvalidTransition { task_id, source })?;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn get_task(&self, task_id: i64) -> PersistenceResult<Option<Task>> {
        let state = self.state.read();
        Ok(state.tasks.iter().find(|t| t.task_id == task_id).cloned())
    }

    async fn task_messages(&self, task_id: i64, page: Page) -> PersistenceResult<Vec<Message>> {
        let state = self.state.read();
        let messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.task_id == task_id)
            .cloned()
            .collect();
        Ok(page.apply(&messages))
    }

    async fn list_tasks(&self, page: Page) -> PersistenceResult<Vec<Task>> {
        Ok(page.apply(&self.state.read().tasks))
    }

    async fn list_messages(&self, page: Page) -> PersistenceResult<Vec<Message>> {
        Ok(page.apply(&self.state.read().messages))
    }
}

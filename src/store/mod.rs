//! # Task Store
//!
//! Durable home of task records and their audit trail. The engine only needs the
//! operations on `TaskStore`; `connect` picks a backend from the database url.
//!
//! - `InMemoryTaskStore`: process-local, used by tests and `database.url = "memory"`
//! - `SqliteTaskStore`: SQLx over SQLite with embedded migrations

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::constants::MEMORY_DATABASE_URL;
use crate::models::{Message, NewTask, Page, Task};
use crate::state_machine::{StateMachineError, TaskStatus};

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// Specific error type for persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("There is no task with id={task_id}")]
    TaskNotFound { task_id: i64 },

    #[error("Task {task_id} cannot be finalized: {source}")]
    InvalidTransition {
        task_id: i64,
        #[source]
        source: StateMachineError,
    },

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage operations the engine relies on
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task with status `in_progress`
    async fn create_task(&self, new_task: NewTask) -> PersistenceResult<Task>;

    /// Append one message to the task's audit trail
    async fn append_message(&self, task_id: i64, body: &str) -> PersistenceResult<Message>;

    /// Move the task to its terminal status, exactly once
    async fn finalize_task(&self, task_id: i64, status: TaskStatus) -> PersistenceResult<Task>;

    async fn get_task(&self, task_id: i64) -> PersistenceResult<Option<Task>>;

    /// Messages of one task in creation order
    async fn task_messages(&self, task_id: i64, page: Page) -> PersistenceResult<Vec<Message>>;

    /// Tasks in creation order
    async fn list_tasks(&self, page: Page) -> PersistenceResult<Vec<Task>>;

    /// Messages of every task in creation order
    async fn list_messages(&self, page: Page) -> PersistenceResult<Vec<Message>>;
}

/// Open the store selected by `config.url`
pub async fn connect(config: &DatabaseConfig) -> PersistenceResult<Arc<dyn TaskStore>> {
    if config.url == MEMORY_DATABASE_URL {
        info!("Using in-memory task store");
        return Ok(Arc::new(InMemoryTaskStore::new()));
    }

    let store = SqliteTaskStore::connect(config).await?;
    Ok(Arc::new(store))
}

//! SQLite-backed task store.
//!
//! Rows are mapped by hand so the status column can be parsed through the state
//! machine's `FromStr`. Message order is the autoincrement id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use super::{PersistenceError, PersistenceResult, TaskStore};
use crate::config::DatabaseConfig;
use crate::models::{Message, NewTask, Page, Task};
use crate::state_machine::{StateMachineError, TaskStateMachine, TaskStatus};

const TASK_COLUMNS: &str = "id, name, car_id, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, task_id, body, created_at";

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> PersistenceResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory_sqlite() {
            // Every connection to `sqlite::memory:` is its own database
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        info!(url = %config.url, "Connected to task database");

        let store = Self::from_pool(pool);
        if config.auto_migrate {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> PersistenceResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn fetch_task(&self, task_id: i64) -> PersistenceResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }
}

fn task_from_row(row: &SqliteRow) -> PersistenceResult<Task> {
    let status: String = row.try_get("status")?;
    let status = TaskStatus::from_str(&status).map_err(|e| PersistenceError::CorruptRow {
        table: "tasks",
        reason: e.to_string(),
    })?;

    Ok(Task {
        task_id: row.try_get("id")?,
        name: row.try_get("name")?,
        car_id: row.try_get("car_id")?,
        status,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn message_from_row(row: &SqliteRow) -> PersistenceResult<Message> {
    Ok(Message {
        message_id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        body: row.try_get("body")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create_task(&self, new_task: NewTask) -> PersistenceResult<Task> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO tasks (name, car_id, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {TASK_COLUMNS}"
        ))
        .bind(&new_task.name)
        .bind(&new_task.car_id)
        .bind(TaskStatus::InProgress.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let task = task_from_row(&row)?;
        debug!(task_id = task.task_id, name = %task.name, "Task row inserted");
        Ok(task)
    }

    async fn append_message(&self, task_id: i64, body: &str) -> PersistenceResult<Message> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages (task_id, body, created_at) \
             SELECT id, ?2, ?3 FROM tasks WHERE id = ?1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(task_id)
        .bind(body)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => message_from_row(&row),
            None => Err(PersistenceError::TaskNotFound { task_id }),
        }
    }

    async fn finalize_task(&self, task_id: i64, status: TaskStatus) -> PersistenceResult<Task> {
        let current = self
            .fetch_task(task_id)
            .await?
            .ok_or(PersistenceError::TaskNotFound { task_id })?;
        let target = TaskStateMachine::finalize(current.status, status)
            .map_err(|source| PersistenceError::InvalidTransition { task_id, source })?;

        // Guarded on the source status so two writers cannot both finalize
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = ?2, updated_at = ?3 \
             WHERE id = ?1 AND status = ?4 RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(target.as_str())
        .bind(Utc::now())
        .bind(current.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => task_from_row(&row),
            None => {
                // Lost the race against another writer
                let latest = self
                    .fetch_task(task_id)
                    .await?
                    .ok_or(PersistenceError::TaskNotFound { task_id })?;
                Err(PersistenceError::InvalidTransition {
                    task_id,
                    source: StateMachineError::InvalidTransition {
                        from: latest.status.to_string(),
                        event: format!("finalize to {status}"),
                    },
                })
            }
        }
    }

    async fn get_task(&self, task_id: i64) -> PersistenceResult<Option<Task>> {
        self.fetch_task(task_id).await
    }

    async fn task_messages(&self, task_id: i64, page: Page) -> PersistenceResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE task_id = ?1 \
             ORDER BY id ASC LIMIT ?2 OFFSET ?3"
        ))
        .bind(task_id)
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn list_tasks(&self, page: Page) -> PersistenceResult<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn list_messages(&self, page: Page) -> PersistenceResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY id ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }
}

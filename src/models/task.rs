//! # Task Model
//!
//! A task is one triggered workflow instance: it is created `in_progress` when a
//! workflow is requested and finalized once by the pipeline run bound to it.
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table:
//! ```sql
//! CREATE TABLE tasks (
//!   id INTEGER PRIMARY KEY AUTOINCREMENT,
//!   name TEXT NOT NULL,
//!   car_id TEXT NOT NULL,
//!   status TEXT NOT NULL,
//!   created_at TEXT NOT NULL,
//!   updated_at TEXT NOT NULL
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::state_machine::TaskStatus;

/// A persisted workflow instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: i64,
    /// Human-readable description, e.g. `check 'car_1'`
    pub name: String,
    /// Vehicle the workflow targets
    pub car_id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub car_id: String,
}

impl NewTask {
    pub fn new(name: impl Into<String>, car_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            car_id: car_id.into(),
        }
    }
}

impl Task {
    /// Build a fresh in-progress task as a store would after insert
    pub fn from_new(task_id: i64, new_task: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            name: new_task.name,
            car_id: new_task.car_id,
            status: TaskStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A task together with its audit trail, messages in creation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWithMessages {
    #[serde(flatten)]
    pub task: Task,
    pub messages: Vec<Message>,
}

impl TaskWithMessages {
    /// Message bodies only, handy for assertions and CLI output
    pub fn bodies(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.body.as_str()).collect()
    }
}

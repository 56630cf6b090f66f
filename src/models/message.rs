//! # Message Model
//!
//! Append-only audit trail entries. A message is written once per step outcome
//! plus one start and one end marker per pipeline run, and never updated.
//! Ordering is the insertion order, exposed through the ascending `message_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub task_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

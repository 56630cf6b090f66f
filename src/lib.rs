#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

//! # Garage Tasks
//!
//! Background step-pipeline engine for garage workflows.
//!
//! ## Overview
//!
//! A caller triggers a named workflow (`check`, `send_for_repair`,
//! `send_to_parking`) for a car. The engine records a task `in_progress`,
//! returns it immediately, and runs the workflow's steps in the background.
//! Every step outcome is appended to the task's audit trail, framed by
//! `Start <name>` and `End <name>` messages, and the task is finalized exactly
//! once as `completed` or `failed`.
//!
//! ## Module Organization
//!
//! - [`garage`] - Garage adapter trait and the simulated garage
//! - [`resilience`] - Bounded retry policy
//! - [`orchestration`] - Steps, pipelines, dispatcher and the service facade
//! - [`store`] - Task store trait with in-memory and SQLite backends
//! - [`state_machine`] - Task status transitions
//! - [`models`] - Tasks, messages, cars and paging
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-wide error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use garage_tasks::config::GarageConfig;
//! use garage_tasks::orchestration::GarageSystem;
//!
//! # async fn example() -> garage_tasks::Result<()> {
//! let system = GarageSystem::bootstrap(GarageConfig::for_testing()).await?;
//! let task = system.service().check_car("car_1").await?;
//!
//! system.shutdown().await;
//! let audit = system.service().task(task.task_id).await?;
//! println!("{} -> {:?}", audit.task.status, audit.bodies());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod garage;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resilience;
pub mod state_machine;
pub mod store;

pub use config::GarageConfig;
pub use error::{GarageError, Result};
pub use garage::{GarageClient, GarageClientError, SimulatedGarage};
pub use models::{Car, CarStatus, Message, Page, Task, TaskWithMessages};
pub use orchestration::{
    Dispatcher, GarageSystem, GarageTaskService, StepPipeline, TokioDispatcher, Workflow,
};
pub use resilience::RetryPolicy;
pub use state_machine::TaskStatus;
pub use store::{InMemoryTaskStore, SqliteTaskStore, TaskStore};

//! # Resilience Module
//!
//! Bounded retry for garage calls that fail transiently. Only the status update
//! step is wrapped; every other step fails on its first error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use garage_tasks::resilience::RetryPolicy;
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(3);
//! let result = policy
//!     .run("update_status", || async { Ok::<_, std::io::Error>("under repair") })
//!     .await;
//! assert!(result.is_ok());
//! # }
//! ```

pub mod retry;

pub use retry::{RetryError, RetryPolicy};

pub mod car;
pub mod message;
pub mod pagination;
pub mod task;

// Re-export core models for easy access
pub use car::{Car, CarStatus};
pub use message::Message;
pub use pagination::Page;
pub use task::{NewTask, Task, TaskWithMessages};

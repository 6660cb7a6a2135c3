pub mod core;

pub use crate::core::asyncqueue::{AsyncQueue, AsyncQueueGuard};
pub use crate::core::clock::Deadline;
pub use crate::core::config::QueueConfig;

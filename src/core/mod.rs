pub mod asyncqueue;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod log;
pub mod queue;
pub mod sync;

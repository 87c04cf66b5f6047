//! Configuration models for schedulers.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, SchedulerSetConfig, MAX_TOKEN_POOL_CAPACITY};

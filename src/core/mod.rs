//! Core scheduling: wait queues, token source, dispatcher and the scheduler facade.

pub mod error;
pub mod scheduler;
mod dispatcher;
mod token_source;
mod wait_queue;

pub use error::{AppResult, SchedulerError};
pub use scheduler::Scheduler;
pub use wait_queue::Admission;

/// Short form of a scheduler id, used in thread names.
pub(crate) fn short_id(id: uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the scheduler and its configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Requests per window or window length is out of range.
    #[error("invalid rate: {0}")]
    InvalidRate(String),
    /// Fewer than one priority level was requested.
    #[error("invalid priority count: {0} (at least 1 priority level is required)")]
    InvalidPriorityCount(usize),
    /// Token pool capacity is out of range.
    #[error("invalid token pool size: {requested} exceeds the maximum of {max}")]
    InvalidPoolSize {
        /// Capacity that was requested.
        requested: usize,
        /// Largest accepted capacity.
        max: usize,
    },
    /// Admission requested for a priority level that does not exist.
    #[error("priority level {priority} does not exist: only {levels} levels are configured")]
    InvalidPriority {
        /// Requested priority level.
        priority: usize,
        /// Number of configured levels.
        levels: usize,
    },
    /// The scheduler has been stopped and accepts no new callers.
    #[error("scheduler stopped")]
    SchedulerStopped,
    /// The caller gave up waiting before being admitted.
    #[error("admission timed out after {0:?}")]
    Timeout(Duration),
    /// The dispatcher is no longer running although the scheduler was not stopped.
    #[error("dispatcher halted")]
    DispatcherHalted,
    /// Configuration could not be parsed or is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A background thread could not be started.
    #[error("failed to spawn {thread} thread: {reason}")]
    Spawn {
        /// Which activity failed to start.
        thread: &'static str,
        /// OS error description.
        reason: String,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

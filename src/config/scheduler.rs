//! Scheduler configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

/// Largest accepted token pool capacity. The pool channel allocates its
/// whole buffer up front.
pub const MAX_TOKEN_POOL_CAPACITY: usize = 1 << 16;

/// Throughput and priority settings for one scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Callers admitted per window.
    pub requests_per_window: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Number of priority levels; level 0 is served first.
    pub priority_levels: usize,
    /// Tokens that may be banked while nobody is waiting. Zero means a
    /// token must be claimed as soon as it is produced.
    #[serde(default)]
    pub token_pool_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 1,
            window_secs: 1,
            priority_levels: 1,
            token_pool_capacity: 0,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration from the four construction parameters.
    #[must_use]
    pub const fn new(
        requests_per_window: u32,
        window_secs: u64,
        priority_levels: usize,
        token_pool_capacity: usize,
    ) -> Self {
        Self {
            requests_per_window,
            window_secs,
            priority_levels,
            token_pool_capacity,
        }
    }

    /// Set the number of callers admitted per window.
    #[must_use]
    pub const fn with_requests_per_window(mut self, requests: u32) -> Self {
        self.requests_per_window = requests;
        self
    }

    /// Set the window length in seconds.
    #[must_use]
    pub const fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_secs = secs;
        self
    }

    /// Set the number of priority levels.
    #[must_use]
    pub const fn with_priority_levels(mut self, levels: usize) -> Self {
        self.priority_levels = levels;
        self
    }

    /// Set the token pool capacity.
    #[must_use]
    pub const fn with_token_pool_capacity(mut self, capacity: usize) -> Self {
        self.token_pool_capacity = capacity;
        self
    }

    /// Validate every parameter.
    ///
    /// # Errors
    ///
    /// - `InvalidRate` for zero requests, a zero window, or a rate so high
    ///   the token interval rounds down to zero
    /// - `InvalidPriorityCount` for zero priority levels
    /// - `InvalidPoolSize` above [`MAX_TOKEN_POOL_CAPACITY`]
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.interval().map(|_| ())
    }

    /// Token generation interval: window length divided by requests per window.
    ///
    /// # Errors
    ///
    /// Same as [`SchedulerConfig::validate`].
    pub fn interval(&self) -> Result<Duration, SchedulerError> {
        if self.requests_per_window < 1 {
            return Err(SchedulerError::InvalidRate(
                "requests_per_window must be at least 1".into(),
            ));
        }
        if self.window_secs < 1 {
            return Err(SchedulerError::InvalidRate(
                "window_secs must be at least 1".into(),
            ));
        }
        if self.priority_levels < 1 {
            return Err(SchedulerError::InvalidPriorityCount(self.priority_levels));
        }
        if self.token_pool_capacity > MAX_TOKEN_POOL_CAPACITY {
            return Err(SchedulerError::InvalidPoolSize {
                requested: self.token_pool_capacity,
                max: MAX_TOKEN_POOL_CAPACITY,
            });
        }

        let interval = Duration::from_secs(self.window_secs) / self.requests_per_window;
        if interval.is_zero() {
            return Err(SchedulerError::InvalidRate(format!(
                "{} requests per {}s is below nanosecond resolution",
                self.requests_per_window, self.window_secs
            )));
        }
        Ok(interval)
    }

    /// Parse a scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the input does not parse (including negative
    /// numbers), otherwise any error from [`SchedulerConfig::validate`].
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// A set of independent, named schedulers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSetConfig {
    /// Map of scheduler name to configuration.
    pub schedulers: HashMap<String, SchedulerConfig>,
}

impl SchedulerSetConfig {
    /// Validate all entries and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending entry.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.schedulers.is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "at least one scheduler must be defined".into(),
            ));
        }
        for (name, cfg) in &self.schedulers {
            cfg.validate().map_err(|e| {
                SchedulerError::InvalidConfig(format!("scheduler `{name}` invalid: {e}"))
            })?;
        }
        Ok(())
    }

    /// Parse a scheduler set from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

//! Tests for error types

use prometheus_throttle::{Admission, SchedulerError};
use std::time::Duration;

#[test]
fn test_invalid_rate_error() {
    let err = SchedulerError::InvalidRate("requests_per_window must be at least 1".into());
    assert_eq!(
        err.to_string(),
        "invalid rate: requests_per_window must be at least 1"
    );
}

#[test]
fn test_invalid_priority_error() {
    let err = SchedulerError::InvalidPriority {
        priority: 4,
        levels: 3,
    };
    assert_eq!(
        err.to_string(),
        "priority level 4 does not exist: only 3 levels are configured"
    );
}

#[test]
fn test_stopped_error() {
    assert_eq!(SchedulerError::SchedulerStopped.to_string(), "scheduler stopped");
}

#[test]
fn test_timeout_error() {
    let err = SchedulerError::Timeout(Duration::from_millis(250));
    assert_eq!(err.to_string(), "admission timed out after 250ms");
}

#[test]
fn test_pool_size_error() {
    let err = SchedulerError::InvalidPoolSize {
        requested: 70_000,
        max: 65_536,
    };
    assert_eq!(
        err.to_string(),
        "invalid token pool size: 70000 exceeds the maximum of 65536"
    );
}

#[test]
fn test_admission_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Admission::Drained).unwrap(), "\"drained\"");
    assert!(Admission::Granted.is_granted());
    assert!(!Admission::Drained.is_granted());
}

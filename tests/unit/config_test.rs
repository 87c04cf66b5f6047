//! Tests for configuration parsing and validation.

use prometheus_throttle::builders::build_schedulers;
use prometheus_throttle::config::{SchedulerConfig, SchedulerSetConfig, MAX_TOKEN_POOL_CAPACITY};
use prometheus_throttle::{Scheduler, SchedulerError};
use std::time::Duration;

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "requests_per_window": 5,
        "window_secs": 1,
        "priority_levels": 3,
        "token_pool_capacity": 5
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg, SchedulerConfig::new(5, 1, 3, 5));
    assert_eq!(cfg.interval().unwrap(), Duration::from_millis(200));
}

#[test]
fn test_negative_values_fail_to_parse() {
    let json = r#"{"requests_per_window": 5, "window_secs": -1, "priority_levels": 3}"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));

    let json = r#"{"requests_per_window": 5, "window_secs": 1, "priority_levels": -2}"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_zero_values_map_to_construction_errors() {
    let json = r#"{"requests_per_window": 0, "window_secs": 1, "priority_levels": 3}"#;
    assert!(matches!(
        SchedulerConfig::from_json_str(json),
        Err(SchedulerError::InvalidRate(_))
    ));

    let json = r#"{"requests_per_window": 5, "window_secs": 1, "priority_levels": 0}"#;
    assert_eq!(
        SchedulerConfig::from_json_str(json),
        Err(SchedulerError::InvalidPriorityCount(0))
    );
}

#[test]
fn test_pool_capacity_limit() {
    let cfg = SchedulerConfig::new(1, 1, 1, MAX_TOKEN_POOL_CAPACITY + 1);
    assert_eq!(
        cfg.validate(),
        Err(SchedulerError::InvalidPoolSize {
            requested: MAX_TOKEN_POOL_CAPACITY + 1,
            max: MAX_TOKEN_POOL_CAPACITY,
        })
    );
}

#[test]
fn test_scheduler_from_config() {
    let cfg = SchedulerConfig::default()
        .with_requests_per_window(4)
        .with_window_secs(2)
        .with_priority_levels(2);
    let scheduler = Scheduler::from_config(&cfg).unwrap();
    assert_eq!(scheduler.interval(), Duration::from_millis(500));
    assert_eq!(scheduler.config(), &cfg);
}

#[test]
fn test_scheduler_set_from_json() {
    let json = r#"{
        "schedulers": {
            "completions": {
                "requests_per_window": 60,
                "window_secs": 60,
                "priority_levels": 3,
                "token_pool_capacity": 10
            },
            "embeddings": {
                "requests_per_window": 10,
                "window_secs": 1,
                "priority_levels": 2
            }
        }
    }"#;

    let cfg = SchedulerSetConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.schedulers.len(), 2);

    let schedulers = build_schedulers(&cfg).unwrap();
    assert_eq!(schedulers["completions"].interval(), Duration::from_secs(1));
    assert_eq!(schedulers["embeddings"].priority_levels(), 2);
}

#[test]
fn test_scheduler_set_names_invalid_entry() {
    let json = r#"{
        "schedulers": {
            "broken": { "requests_per_window": 1, "window_secs": 0, "priority_levels": 1 }
        }
    }"#;
    let err = SchedulerSetConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn test_scheduler_set_requires_entries() {
    let err = SchedulerSetConfig::from_json_str(r#"{"schedulers": {}}"#).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

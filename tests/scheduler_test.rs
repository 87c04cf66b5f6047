//! Integration tests for the blocking admission API.
//!
//! These tests validate:
//! 1. Construction parameters are checked before anything starts
//! 2. The first token is available right away
//! 3. Steady-state throughput follows the configured interval
//! 4. Higher priorities are always served first
//! 5. Stop releases every waiting caller and rejects new ones

use prometheus_throttle::{Admission, Scheduler, SchedulerError};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_zero_requests_rejected() {
    let err = Scheduler::new(0, 1, 1, 0).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidRate(_)));
}

#[test]
fn test_zero_window_rejected() {
    let err = Scheduler::new(1, 0, 1, 0).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidRate(_)));
}

#[test]
fn test_zero_priority_levels_rejected() {
    let err = Scheduler::new(1, 1, 0, 0).unwrap_err();
    assert_eq!(err, SchedulerError::InvalidPriorityCount(0));
}

#[test]
fn test_oversized_pool_rejected() {
    let err = Scheduler::new(1, 1, 1, usize::MAX).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidPoolSize { .. }));
}

#[test]
fn test_interval_and_accessors() {
    let scheduler = Scheduler::new(5, 1, 3, 5).unwrap();
    assert_eq!(scheduler.interval(), Duration::from_millis(200));
    assert_eq!(scheduler.priority_levels(), 3);
    assert_eq!(scheduler.config().token_pool_capacity, 5);
    assert!(!scheduler.is_stopped());
}

// ============================================================================
// ADMISSION
// ============================================================================

#[test]
fn test_first_token_is_immediate() {
    // One call per minute: anything but the eager token would take 60s.
    let scheduler = Scheduler::new(1, 60, 3, 0).unwrap();
    let started = Instant::now();
    assert_eq!(scheduler.can_proceed(2).unwrap(), Admission::Granted);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_invalid_priority_rejected_without_blocking() {
    let scheduler = Scheduler::new(1, 60, 3, 0).unwrap();
    assert_eq!(
        scheduler.can_proceed(3),
        Err(SchedulerError::InvalidPriority {
            priority: 3,
            levels: 3
        })
    );
    // The rejected call must not have consumed the eager token.
    assert_eq!(
        scheduler.can_proceed_timeout(0, Duration::from_secs(5)),
        Ok(Admission::Granted)
    );
}

#[test]
fn test_throughput_follows_interval() {
    // 50ms between tokens, at most one banked.
    let scheduler = Scheduler::new(20, 1, 1, 1).unwrap();
    scheduler.can_proceed(0).unwrap();

    let started = Instant::now();
    for _ in 0..10 {
        scheduler.can_proceed(0).unwrap();
    }
    let elapsed = started.elapsed();

    // Ten gaps of ~50ms; at most one extra banked token can shorten it.
    assert!(elapsed >= Duration::from_millis(400), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2000), "too slow: {elapsed:?}");
}

#[test]
fn test_three_priority_batches_complete_in_priority_order() {
    // 5 per second, 3 levels, pool of 5.
    let scheduler = Arc::new(Scheduler::new(5, 1, 3, 5).unwrap());

    // Take the eager token so all 15 callers queue before the next one.
    scheduler.can_proceed(0).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let mut workers = Vec::new();
    for batch in 0..5 {
        for priority in 0..3 {
            let scheduler = Arc::clone(&scheduler);
            let done_tx = done_tx.clone();
            workers.push(thread::spawn(move || {
                let admission = scheduler.can_proceed(priority).unwrap();
                done_tx.send((priority, batch, admission)).unwrap();
            }));
        }
    }
    drop(done_tx);

    let completed: Vec<_> = done_rx.iter().collect();
    assert_eq!(completed.len(), 15);
    assert!(completed.iter().all(|(_, _, a)| *a == Admission::Granted));

    let priorities: Vec<usize> = completed.iter().map(|(p, _, _)| *p).collect();
    let mut sorted = priorities.clone();
    sorted.sort_unstable();
    assert_eq!(priorities, sorted, "callers completed out of priority order");

    for worker in workers {
        worker.join().unwrap();
    }
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_stop_drains_blocked_callers() {
    // One token per minute: only the eager token is ever granted.
    let scheduler = Arc::new(Scheduler::new(1, 60, 2, 0).unwrap());
    scheduler.can_proceed(0).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let workers: Vec<_> = (0..5)
        .map(|i| {
            let scheduler = Arc::clone(&scheduler);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                done_tx.send(scheduler.can_proceed(i % 2)).unwrap();
            })
        })
        .collect();
    drop(done_tx);

    thread::sleep(Duration::from_millis(200));
    scheduler.stop();

    let results: Vec<_> = done_rx.iter().collect();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| *r == Ok(Admission::Drained)));
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(scheduler.is_stopped());
    assert_eq!(scheduler.can_proceed(0), Err(SchedulerError::SchedulerStopped));
    assert_eq!(
        scheduler.can_proceed_timeout(1, Duration::from_millis(10)),
        Err(SchedulerError::SchedulerStopped)
    );
}

#[test]
fn test_stop_is_idempotent() {
    let scheduler = Scheduler::new(10, 1, 1, 2).unwrap();
    scheduler.stop();
    scheduler.stop();
    assert!(scheduler.is_stopped());
}

#[test]
fn test_stop_with_full_pool_returns_promptly() {
    let scheduler = Scheduler::new(1000, 1, 1, 4).unwrap();
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    scheduler.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_drop_tears_down_background_threads() {
    let started = Instant::now();
    {
        let scheduler = Scheduler::new(1, 60, 2, 0).unwrap();
        scheduler.can_proceed(1).unwrap();
        // The dispatcher is now blocked waiting for the next token.
    }
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_independent_schedulers() {
    let slow = Scheduler::new(1, 60, 1, 0).unwrap();
    let fast = Scheduler::new(50, 1, 1, 0).unwrap();

    slow.can_proceed(0).unwrap();
    for _ in 0..5 {
        fast.can_proceed(0).unwrap();
    }
    assert_eq!(
        slow.can_proceed_timeout(0, Duration::from_millis(50)),
        Err(SchedulerError::Timeout(Duration::from_millis(50)))
    );

    fast.stop();
    assert!(!slow.is_stopped());
}

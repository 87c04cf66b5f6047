//! Priority-aware throughput scheduler.
//!
//! A [`Scheduler`] lets callers proceed at no more than `requests_per_window`
//! per `window_secs`, serving the highest priority level first and callers
//! of the same level in arrival order.
//!
//! # Design
//!
//! - **Token source**: a thread drops one token into a bounded pool per
//!   interval, starting with one immediately
//! - **Wait queues**: one FIFO of blocked callers per priority level
//! - **Dispatcher**: a thread that, per token, consumes one registration
//!   signal and releases the oldest caller of the first non-empty level
//! - **Admission gate**: callers register under a read lock that `stop`
//!   takes for writing, so nobody can enqueue after the drain
//!
//! # Example
//!
//! ```rust,no_run
//! use prometheus_throttle::Scheduler;
//!
//! // 5 calls per second, 3 priority levels, up to 5 banked tokens.
//! let scheduler = Scheduler::new(5, 1, 3, 5)?;
//!
//! scheduler.can_proceed(0)?; // blocks until admitted
//! scheduler.stop();
//! # Ok::<(), prometheus_throttle::SchedulerError>(())
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::core::dispatcher::spawn_dispatcher;
use crate::core::token_source::{spawn_token_source, Token};
use crate::core::wait_queue::{Admission, CallerHandle, WaitQueues};
use crate::core::SchedulerError;

/// Rate limiter that admits callers in strict priority order.
///
/// Multiple schedulers are fully independent and may be used side by side.
/// Dropping a scheduler stops it.
pub struct Scheduler {
    id: Uuid,
    config: SchedulerConfig,
    interval: Duration,
    queues: Arc<WaitQueues>,
    /// `true` once `stop` has begun. Registration holds the read side.
    stopped: RwLock<bool>,
    signal_tx: Sender<()>,
    /// Dropping the sender disconnects both background threads.
    stop_tx: Mutex<Option<Sender<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create and start a scheduler.
    ///
    /// The token interval is `window_secs / requests_per_window`. The first
    /// token is produced immediately, so a caller arriving right after
    /// construction does not wait a full interval.
    ///
    /// # Errors
    ///
    /// - `InvalidRate` if `requests_per_window` or `window_secs` is zero
    /// - `InvalidPriorityCount` if `priority_levels` is zero
    /// - `InvalidPoolSize` if `token_pool_capacity` is too large
    /// - `Spawn` if a background thread cannot be started
    pub fn new(
        requests_per_window: u32,
        window_secs: u64,
        priority_levels: usize,
        token_pool_capacity: usize,
    ) -> Result<Self, SchedulerError> {
        Self::from_config(&SchedulerConfig::new(
            requests_per_window,
            window_secs,
            priority_levels,
            token_pool_capacity,
        ))
    }

    /// Create and start a scheduler from a configuration.
    ///
    /// Nothing is left running when this fails.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::new`].
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        // Validated before any thread is spawned.
        let interval = config.interval()?;
        let id = Uuid::new_v4();

        let queues = Arc::new(WaitQueues::new(config.priority_levels));
        let (token_tx, token_rx) = bounded::<Token>(config.token_pool_capacity);
        let (signal_tx, signal_rx) = unbounded::<()>();
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let seeder = spawn_token_source(id, interval, token_tx, stop_rx.clone()).map_err(|e| {
            SchedulerError::Spawn {
                thread: "token source",
                reason: e.to_string(),
            }
        })?;

        let dispatcher =
            match spawn_dispatcher(id, Arc::clone(&queues), token_rx, signal_rx, stop_rx) {
                Ok(handle) => handle,
                Err(e) => {
                    drop(stop_tx);
                    let _ = seeder.join();
                    return Err(SchedulerError::Spawn {
                        thread: "dispatcher",
                        reason: e.to_string(),
                    });
                }
            };

        info!(
            scheduler = %id,
            requests_per_window = config.requests_per_window,
            window_secs = config.window_secs,
            priority_levels = config.priority_levels,
            token_pool_capacity = config.token_pool_capacity,
            ?interval,
            "scheduler started"
        );

        Ok(Self {
            id,
            config: config.clone(),
            interval,
            queues,
            stopped: RwLock::new(false),
            signal_tx,
            stop_tx: Mutex::new(Some(stop_tx)),
            workers: Mutex::new(vec![seeder, dispatcher]),
        })
    }

    /// Block until the caller may proceed.
    ///
    /// Priority 0 is served first; callers of the same priority are served
    /// in arrival order. Returns [`Admission::Granted`] when released against
    /// a token, or [`Admission::Drained`] when released because the scheduler
    /// stopped while the caller was waiting.
    ///
    /// # Errors
    ///
    /// - `InvalidPriority` if `priority` is not below the configured level count
    /// - `SchedulerStopped` if the scheduler has been stopped
    /// - `DispatcherHalted` if the dispatcher died without a stop
    pub fn can_proceed(&self, priority: usize) -> Result<Admission, SchedulerError> {
        let handle = self.register(priority)?;
        Ok(handle.wait())
    }

    /// Like [`Scheduler::can_proceed`], giving up after `timeout`.
    ///
    /// A caller that times out is removed from its queue and its pending
    /// registration is retracted, so no token is spent on it.
    ///
    /// # Errors
    ///
    /// `Timeout` when not released in time, plus everything
    /// [`Scheduler::can_proceed`] returns.
    pub fn can_proceed_timeout(
        &self,
        priority: usize,
        timeout: Duration,
    ) -> Result<Admission, SchedulerError> {
        let handle = self.register(priority)?;
        if let Some(admission) = handle.wait_for(timeout) {
            return Ok(admission);
        }
        if self.queues.withdraw(priority, &handle, true) {
            debug!(scheduler = %self.id, priority, ?timeout, "admission timed out");
            return Err(SchedulerError::Timeout(timeout));
        }
        // Released between the deadline and the withdrawal.
        Ok(handle.wait())
    }

    /// Async variant of [`Scheduler::can_proceed`].
    ///
    /// Dropping the returned future before it completes withdraws the caller
    /// from its queue.
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::can_proceed`].
    #[cfg(feature = "tokio-runtime")]
    pub async fn can_proceed_async(&self, priority: usize) -> Result<Admission, SchedulerError> {
        let handle = self.register(priority)?;
        let mut pending = PendingAdmission {
            scheduler: self.id,
            queues: &self.queues,
            priority,
            handle: Some(handle.clone()),
        };
        let admission = handle.wait_async().await;
        pending.handle = None;
        Ok(admission)
    }

    /// Stop the scheduler.
    ///
    /// Halts the token source and the dispatcher, waits for both threads to
    /// exit, then releases every still-waiting caller with
    /// [`Admission::Drained`]. Later admission calls fail with
    /// `SchedulerStopped`. Calling `stop` again is a no-op that still waits
    /// for an in-progress teardown to finish.
    pub fn stop(&self) {
        {
            let mut stopped = self.stopped.write();
            if !*stopped {
                info!(scheduler = %self.id, "stopping scheduler");
            }
            *stopped = true;
        }

        let mut workers = self.workers.lock();
        let tearing_down = !workers.is_empty();
        self.stop_tx.lock().take();
        for worker in workers.drain(..) {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                error!(scheduler = %self.id, thread = %name, "background thread panicked");
            }
        }

        let drained = self.queues.drain();
        if drained > 0 {
            warn!(scheduler = %self.id, drained, "released waiting callers without tokens");
        }
        if tearing_down {
            info!(scheduler = %self.id, "scheduler stopped");
        }
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stopped.read()
    }

    /// Identifier used in this scheduler's log records.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Time between two generated tokens.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of priority levels.
    #[must_use]
    pub fn priority_levels(&self) -> usize {
        self.queues.levels()
    }

    /// Configuration this scheduler was built from.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Enqueue a new caller and announce it to the dispatcher.
    fn register(&self, priority: usize) -> Result<CallerHandle, SchedulerError> {
        let levels = self.queues.levels();
        if priority >= levels {
            return Err(SchedulerError::InvalidPriority { priority, levels });
        }

        let stopped = self.stopped.read();
        if *stopped {
            return Err(SchedulerError::SchedulerStopped);
        }

        let handle = CallerHandle::new();
        self.queues.enqueue(priority, handle.clone());
        // Unbounded: never blocks the caller.
        if self.signal_tx.send(()).is_err() {
            self.queues.withdraw(priority, &handle, false);
            error!(scheduler = %self.id, priority, "dispatcher is gone, rejecting caller");
            return Err(SchedulerError::DispatcherHalted);
        }
        drop(stopped);

        Ok(handle)
    }

    #[cfg(test)]
    fn queued(&self, priority: usize) -> usize {
        self.queues.len(priority)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("interval", &self.interval)
            .field("waiting", &self.queues.total_len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Withdraws an async caller whose future is dropped before release.
#[cfg(feature = "tokio-runtime")]
struct PendingAdmission<'a> {
    scheduler: Uuid,
    queues: &'a WaitQueues,
    priority: usize,
    handle: Option<CallerHandle>,
}

#[cfg(feature = "tokio-runtime")]
impl Drop for PendingAdmission<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.queues.withdraw(self.priority, &handle, true) {
                debug!(
                    scheduler = %self.scheduler,
                    priority = self.priority,
                    "async caller cancelled before admission"
                );
            } else if handle.outcome() == Some(Admission::Granted) {
                debug!(
                    scheduler = %self.scheduler,
                    priority = self.priority,
                    "async caller cancelled after being granted"
                );
            }
        }
    }
}

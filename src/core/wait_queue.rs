//! Per-priority wait queues and the one-shot caller handles they hold.
//!
//! Every blocked admission call owns a [`CallerHandle`] that starts out held
//! and is released exactly once, either by the dispatcher against a token or
//! by the shutdown drain. Handles sit in one [`WaitQueue`] per priority level;
//! [`WaitQueues`] groups the levels together with the retraction counter used
//! when a caller withdraws before being released.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// How a blocked admission call was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Released by the dispatcher against a token.
    Granted,
    /// Released by the shutdown drain without consuming a token. The
    /// throughput limit was not applied to this caller.
    Drained,
}

impl Admission {
    /// True when the caller was admitted against a token.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

struct HandleState {
    outcome: Mutex<Option<Admission>>,
    released: Condvar,
    #[cfg(feature = "tokio-runtime")]
    notify: tokio::sync::Notify,
}

/// Single-use blocking slot for one waiting caller.
///
/// Clones share the same slot: one copy lives in the wait queue, the other
/// stays with the caller that blocks on it.
#[derive(Clone)]
pub(crate) struct CallerHandle {
    state: Arc<HandleState>,
}

impl CallerHandle {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(HandleState {
                outcome: Mutex::new(None),
                released: Condvar::new(),
                #[cfg(feature = "tokio-runtime")]
                notify: tokio::sync::Notify::new(),
            }),
        }
    }

    /// Unblock the waiter. Only the first release is recorded.
    pub(crate) fn release(&self, admission: Admission) {
        let mut outcome = self.state.outcome.lock();
        if outcome.is_some() {
            return;
        }
        *outcome = Some(admission);
        drop(outcome);
        self.state.released.notify_all();
        // Notify stores a permit when nobody is awaiting yet.
        #[cfg(feature = "tokio-runtime")]
        self.state.notify.notify_one();
    }

    /// Block the current thread until released.
    pub(crate) fn wait(&self) -> Admission {
        let mut outcome = self.state.outcome.lock();
        loop {
            if let Some(admission) = *outcome {
                return admission;
            }
            self.state.released.wait(&mut outcome);
        }
    }

    /// Block until released or until `timeout` elapses.
    pub(crate) fn wait_for(&self, timeout: Duration) -> Option<Admission> {
        let mut outcome = self.state.outcome.lock();
        let _ = self
            .state
            .released
            .wait_while_for(&mut outcome, |o| o.is_none(), timeout);
        *outcome
    }

    /// Wait for release without blocking the async runtime.
    #[cfg(feature = "tokio-runtime")]
    pub(crate) async fn wait_async(&self) -> Admission {
        loop {
            let outcome = self.outcome();
            if let Some(admission) = outcome {
                return admission;
            }
            self.state.notify.notified().await;
        }
    }

    #[cfg(any(test, feature = "tokio-runtime"))]
    pub(crate) fn outcome(&self) -> Option<Admission> {
        *self.state.outcome.lock()
    }

    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// FIFO of blocked callers for one priority level.
#[derive(Default)]
pub(crate) struct WaitQueue {
    waiters: Mutex<VecDeque<CallerHandle>>,
}

impl WaitQueue {
    pub(crate) fn enqueue(&self, handle: CallerHandle) {
        self.waiters.lock().push_back(handle);
    }

    /// Release the longest-waiting caller, if any.
    pub(crate) fn release_oldest(&self, admission: Admission) -> bool {
        let mut waiters = self.waiters.lock();
        match waiters.pop_front() {
            Some(handle) => {
                handle.release(admission);
                true
            }
            None => false,
        }
    }

    /// Remove `handle` without releasing it. Runs `on_removed` inside the
    /// critical section when the handle was still queued.
    fn remove_with(&self, handle: &CallerHandle, on_removed: impl FnOnce()) -> bool {
        let mut waiters = self.waiters.lock();
        let Some(pos) = waiters.iter().position(|h| h.same_as(handle)) else {
            return false;
        };
        waiters.remove(pos);
        on_removed();
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().len()
    }
}

/// The full set of wait queues, index 0 being the highest priority.
pub(crate) struct WaitQueues {
    levels: Vec<WaitQueue>,
    /// Callers that withdrew after their registration signal was sent.
    retractions: AtomicUsize,
}

impl WaitQueues {
    pub(crate) fn new(priority_levels: usize) -> Self {
        Self {
            levels: (0..priority_levels).map(|_| WaitQueue::default()).collect(),
            retractions: AtomicUsize::new(0),
        }
    }

    pub(crate) fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Append to the tail of `priority`'s queue. The level must exist.
    pub(crate) fn enqueue(&self, priority: usize, handle: CallerHandle) {
        self.levels[priority].enqueue(handle);
    }

    /// Grant the oldest caller of the highest non-empty level and return
    /// that level.
    pub(crate) fn release_next(&self) -> Option<usize> {
        self.levels
            .iter()
            .position(|queue| queue.release_oldest(Admission::Granted))
    }

    /// Take a caller out of its queue before it was released.
    ///
    /// With `retract` set, the caller's outstanding registration signal is
    /// accounted for by a retraction recorded under the queue lock, so a
    /// dispatch cycle that misses it always sees the retraction.
    pub(crate) fn withdraw(&self, priority: usize, handle: &CallerHandle, retract: bool) -> bool {
        self.levels[priority].remove_with(handle, || {
            if retract {
                self.retractions.fetch_add(1, Ordering::AcqRel);
            }
        })
    }

    /// Consume one pending retraction, if any.
    pub(crate) fn take_retraction(&self) -> bool {
        self.retractions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Force-release every queued caller, level by level. Returns the count.
    pub(crate) fn drain(&self) -> usize {
        let mut drained = 0;
        for queue in &self.levels {
            while queue.release_oldest(Admission::Drained) {
                drained += 1;
            }
        }
        drained
    }

    #[cfg(test)]
    pub(crate) fn len(&self, priority: usize) -> usize {
        self.levels[priority].len()
    }

    pub(crate) fn total_len(&self) -> usize {
        self.levels.iter().map(WaitQueue::len).sum()
    }
}

//! # Prometheus Throttle
//!
//! A priority-aware throughput scheduler for workloads that must stay under an
//! external rate limit (a metered inference API, a shared GPU queue, a
//! third-party service) while letting important work jump ahead.
//!
//! A [`Scheduler`] admits at most `N` callers per time window. Callers block in
//! [`Scheduler::can_proceed`] until a token is available for them; the
//! highest-priority waiting caller is always served first, and callers of the
//! same priority are served in arrival order.
//!
//! ## How It Works
//!
//! - **Token source**: a background thread produces one token every
//!   `window / N`, starting with one token immediately. Up to
//!   `token_pool_capacity` unclaimed tokens are banked; beyond that, generation
//!   waits.
//! - **Wait queues**: one FIFO per priority level; level 0 is the most
//!   important.
//! - **Dispatcher**: a background thread that, for every token, releases the
//!   oldest caller of the highest non-empty level.
//! - **Shutdown**: [`Scheduler::stop`] halts both threads and releases every
//!   waiting caller with [`Admission::Drained`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use prometheus_throttle::{Admission, Scheduler};
//!
//! // 5 calls per second, 3 priorities, 5 banked tokens.
//! let scheduler = Arc::new(Scheduler::new(5, 1, 3, 5)?);
//!
//! let workers: Vec<_> = (0..9)
//!     .map(|i| {
//!         let scheduler = Arc::clone(&scheduler);
//!         thread::spawn(move || {
//!             if scheduler.can_proceed(i % 3) == Ok(Admission::Granted) {
//!                 // call the rate-limited service
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! scheduler.stop();
//! # Ok::<(), prometheus_throttle::SchedulerError>(())
//! ```
//!
//! With the default `tokio-runtime` feature, `Scheduler::can_proceed_async`
//! waits without blocking the runtime.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: wait queues, token source, dispatcher, scheduler facade.
pub mod core;
/// Configuration models for schedulers.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;

pub use crate::config::SchedulerConfig;
pub use crate::core::{Admission, Scheduler, SchedulerError};

//! Demonstration driver: batches of workers at three priorities sharing a
//! 5 requests/second budget.
//!
//! Run with `RUST_LOG=prometheus_throttle=debug cargo run --example batches`.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use prometheus_throttle::core::AppResult;
use prometheus_throttle::util::init_tracing_with_default;
use prometheus_throttle::{Admission, Scheduler};

const REQUESTS: u32 = 5;
const WINDOW_SECS: u64 = 1;
const PRIORITIES: usize = 3;
const POOL: usize = 5;
const BATCHES: usize = 5;

fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing_with_default("prometheus_throttle=info");

    let scheduler = Arc::new(
        Scheduler::new(REQUESTS, WINDOW_SECS, PRIORITIES, POOL)
            .context("failed to build scheduler")?,
    );

    let fill_up = scheduler.interval() * u32::try_from(POOL)?;
    println!(
        "Token pool holds {POOL}; waiting {fill_up:?} for it to fill at {:.2} req/s.",
        f64::from(REQUESTS) / WINDOW_SECS as f64
    );
    thread::sleep(fill_up);

    let started = Instant::now();
    let (done_tx, done_rx) = mpsc::channel();
    for batch in 0..BATCHES {
        for priority in 0..PRIORITIES {
            let scheduler = Arc::clone(&scheduler);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let admission = scheduler.can_proceed(priority);
                let _ = done_tx.send((priority, batch, admission, started.elapsed()));
            });
        }
    }
    drop(done_tx);
    println!("{} workers launched.\n", BATCHES * PRIORITIES);

    for (priority, batch, admission, elapsed) in done_rx.iter() {
        match admission? {
            Admission::Granted => println!(
                "worker priority={priority} batch={batch} admitted after {:>6.0?}",
                round_ms(elapsed)
            ),
            Admission::Drained => println!("worker priority={priority} batch={batch} drained"),
        }
    }

    scheduler.stop();
    println!("\nAll workers done.");
    Ok(())
}

fn round_ms(d: Duration) -> Duration {
    Duration::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

//! The dispatcher loop pairing tokens with waiting callers by priority.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, TryRecvError};
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use super::short_id;
use super::token_source::Token;
use super::wait_queue::WaitQueues;

/// Start the dispatcher thread.
///
/// For every token taken from the pool the dispatcher consumes one
/// registration signal and grants the oldest caller of the highest-priority
/// non-empty queue. Exits when the token pool closes, the signal channel
/// closes, or `stop_rx` disconnects.
pub(crate) fn spawn_dispatcher(
    scheduler: Uuid,
    queues: Arc<WaitQueues>,
    token_rx: Receiver<Token>,
    signal_rx: Receiver<()>,
    stop_rx: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("throttle-dispatch-{}", short_id(scheduler)))
        .spawn(move || {
            debug!(scheduler = %scheduler, levels = queues.levels(), "dispatcher started");
            let granted = run(scheduler, &queues, &token_rx, &signal_rx, &stop_rx);
            info!(scheduler = %scheduler, granted, "dispatcher ended");
        })
}

fn run(
    scheduler: Uuid,
    queues: &WaitQueues,
    token_rx: &Receiver<Token>,
    signal_rx: &Receiver<()>,
    stop_rx: &Receiver<()>,
) -> u64 {
    let mut granted = 0;
    loop {
        if matches!(stop_rx.try_recv(), Err(TryRecvError::Disconnected)) {
            return granted;
        }

        select! {
            recv(token_rx) -> token => {
                if token.is_err() {
                    return granted;
                }
            }
            recv(stop_rx) -> _ => return granted,
        }

        // Hold the token until some caller can take it.
        loop {
            select! {
                recv(signal_rx) -> signal => {
                    if signal.is_err() {
                        return granted;
                    }
                }
                recv(stop_rx) -> _ => return granted,
            }

            if let Some(level) = queues.release_next() {
                granted += 1;
                trace!(scheduler = %scheduler, priority = level, "caller granted");
                break;
            }

            // The signal belonged to a caller that withdrew; keep the token.
            if queues.take_retraction() {
                trace!(scheduler = %scheduler, "signal matched a withdrawn caller");
                continue;
            }

            error!(
                scheduler = %scheduler,
                "registration signal received with every wait queue empty"
            );
            panic!("dispatcher invariant violated: registration signal without a queued caller");
        }
    }
}

//! Periodic token generation into the bounded token pool.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver, Sender};
use tracing::{debug, info};
use uuid::Uuid;

use super::short_id;

/// Unit of permission to admit one caller.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Token;

/// Start the token source thread.
///
/// One token is offered immediately, then one per `interval`. When the pool
/// is full the thread blocks on the send; ticks that fire meanwhile are
/// coalesced by the ticker rather than queued. The thread exits once
/// `stop_rx` disconnects, dropping `token_tx` so the dispatcher sees the
/// pool close.
pub(crate) fn spawn_token_source(
    scheduler: Uuid,
    interval: Duration,
    token_tx: Sender<Token>,
    stop_rx: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("throttle-seeder-{}", short_id(scheduler)))
        .spawn(move || {
            debug!(scheduler = %scheduler, ?interval, "token source started");
            let ticker = tick(interval);
            let mut emitted: u64 = 0;

            if offer(&token_tx, &stop_rx) {
                emitted += 1;
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            if !offer(&token_tx, &stop_rx) {
                                break;
                            }
                            emitted += 1;
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
            }

            info!(scheduler = %scheduler, emitted, "token source ended");
        })
}

/// Place one token in the pool, giving up if stop is signalled first.
fn offer(token_tx: &Sender<Token>, stop_rx: &Receiver<()>) -> bool {
    select! {
        send(token_tx, Token) -> res => res.is_ok(),
        recv(stop_rx) -> _ => false,
    }
}

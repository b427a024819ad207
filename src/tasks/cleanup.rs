//! Stale-Sweep Janitor
//!
//! Background task that periodically removes stale cache entries. The
//! janitor is parameterized over a sweep closure so both backends share
//! one task implementation; correctness under concurrent caller
//! operations relies entirely on the store's own locking.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;

// == Janitor ==
/// Handle to a running stale-sweep task.
///
/// Two states: running and stopped. [`stop`](Self::stop) signals the
/// task to finish its loop and is idempotent; stopped is terminal, there
/// is no restart path. Dropping the handle aborts the task outright, so
/// a cache going out of scope can never leak its janitor.
#[derive(Debug)]
pub struct Janitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Janitor {
    /// Spawns a janitor that runs `sweep` every `interval`.
    ///
    /// Each backend passes a closure over its own cheap-clone store
    /// handle; the closure returns how many entries it removed. Sweep
    /// errors are logged and swallowed — the task stays alive until
    /// stopped.
    pub fn spawn<F, Fut>(interval: Duration, mut sweep: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<usize>> + Send,
    {
        let (shutdown, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "janitor started");

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        match sweep().await {
                            Ok(0) => debug!("stale sweep: nothing to remove"),
                            Ok(removed) => info!(removed, "stale sweep removed entries"),
                            Err(err) => warn!(error = %err, "stale sweep failed"),
                        }
                    }
                    _ = stop_rx.changed() => {
                        debug!("janitor stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signals the task to stop after its current iteration.
    ///
    /// Idempotent: repeated calls just re-send the same watch value.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// True once the background task has terminated.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        // backstop for handles dropped without an explicit stop
        self.handle.abort();
    }
}

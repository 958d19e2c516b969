//! Expiration Sweeper Task
//!
//! Background task that periodically removes expired cache entries,
//! independent of reads.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::WeakResponseCache;
use crate::error::{CacheError, Result};

// == Sweeper Handle ==
/// Owner side of a running sweeper.
///
/// Dropping the handle also stops the task: the shutdown channel closes and
/// the loop exits at its next wake-up.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Requests the task to stop. Idempotent.
    pub fn signal_stop(&self) {
        // send_replace never fails, even once the task has exited
        self.shutdown_tx.send_replace(true);
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to exit.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "Sweeper task ended abnormally");
        }
    }
}

/// Spawns the sweeper on the current tokio runtime.
///
/// The task holds only a weak reference to the cache and exits on its own
/// if every cache handle is dropped. Each pass runs under the cache lock and
/// re-checks the stop flag there, so no pass starts after a stop completed.
pub(crate) fn spawn_sweeper(cache: WeakResponseCache, interval: Duration) -> Result<SweeperHandle> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|err| CacheError::NoRuntime(err.to_string()))?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = runtime.spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiration sweeper");

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Expiration sweeper shutting down");
                        return;
                    }
                    continue;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, stopping expiration sweeper");
                return;
            };

            match cache.sweep(|| *shutdown_rx.borrow()) {
                Some(0) => debug!("Sweep: no expired entries found"),
                Some(removed) => info!(removed, "Sweep: removed expired entries"),
                None => {
                    info!("Expiration sweeper shutting down");
                    return;
                }
            }
        }
    });

    Ok(SweeperHandle { shutdown_tx, task })
}

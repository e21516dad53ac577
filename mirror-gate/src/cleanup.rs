//! Background cleanup task for the dedup ledger.
//!
//! Runs periodically to forget message ids older than the retention window.
//! A failed pass is logged and the loop keeps going; only cancellation
//! stops it.

use crate::clock::Clock;
use crate::config::CleanupConfig;
use crate::ledger::DedupLedger;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawn a background cleanup task.
///
/// The first sweep happens one interval after spawning. The task exits
/// when `cancel` fires, or immediately if cleanup is disabled.
pub fn spawn_cleanup_task(
    ledger: Arc<DedupLedger>,
    clock: Arc<dyn Clock>,
    config: CleanupConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Ledger cleanup task disabled");
            return;
        }

        let period = config.interval();
        tracing::info!("Ledger cleanup task started (interval: {}s)", period.as_secs());

        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Ledger cleanup task stopped");
                    break;
                }
                _ = timer.tick() => {
                    match sweep(&ledger, clock.as_ref()) {
                        Ok(expired) => {
                            if expired > 0 {
                                tracing::info!(
                                    "Cleanup: forgot {} message ids ({} remaining)",
                                    expired,
                                    ledger.len()
                                );
                            } else {
                                tracing::debug!("Cleanup: no expired message ids");
                            }
                        }
                        Err(reason) => {
                            tracing::error!("Cleanup error: {}", reason);
                        }
                    }
                }
            }
        }
    })
}

/// One expiry pass, with panics turned into an error string.
fn sweep(ledger: &DedupLedger, clock: &dyn Clock) -> Result<usize, String> {
    std::panic::catch_unwind(AssertUnwindSafe(|| ledger.expire(clock.now_millis())))
        .map_err(|payload| panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owns a running cleanup task.
///
/// Dropping the handle cancels the task; [`CleanupHandle::shutdown`] also
/// waits for it to finish.
#[derive(Debug)]
pub struct CleanupHandle {
    cancel: CancellationToken,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl CleanupHandle {
    /// Start cleaning `ledger` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(ledger: Arc<DedupLedger>, clock: Arc<dyn Clock>, config: CleanupConfig) -> Self {
        let cancel = CancellationToken::new();
        let join = spawn_cleanup_task(ledger, clock, config, cancel.clone());
        Self {
            cancel,
            join: Some(join),
        }
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::error!("Ledger cleanup task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

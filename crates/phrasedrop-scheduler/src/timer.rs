//! Background cycle timer — sliced sleeps, cooperative stop, bounded join.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration as StdDuration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use phrasedrop_core::error::{PhrasedropError, Result};

use crate::wakeup::WakeupSchedule;

/// Upper bound on one uninterrupted sleep. The worker re-checks the stop
/// signal at each slice boundary, so worst-case shutdown latency is one
/// slice, not the full remaining wait.
const SLEEP_SLICE: StdDuration = StdDuration::from_secs(5);

/// How long `stop()` waits for the worker before asking the caller to retry.
const JOIN_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Periodic timer owning one background worker.
///
/// The callback runs to completion on the worker before the next wakeup is
/// computed, so cycles never overlap: an overrunning cycle delays the next
/// wakeup instead of racing it.
pub struct CycleTimer {
    stop_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl CycleTimer {
    pub fn start<F, Fut>(schedule: WakeupSchedule, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let worker = tokio::spawn(async move {
            let mut next = schedule.next_wakeup(Utc::now());
            tracing::info!("⏰ Cycle timer started, first wakeup at {next}");
            while !*stop_rx.borrow() {
                let now = Utc::now();
                if now >= next {
                    tracing::info!("🔔 Woke up at {now}, running delivery cycle");
                    if AssertUnwindSafe(callback()).catch_unwind().await.is_err() {
                        tracing::error!("Delivery cycle panicked; the timer keeps running");
                    }
                    next = schedule.next_wakeup(Utc::now());
                    tracing::info!("Next wakeup at {next}");
                    continue;
                }
                let remaining = (next - now).to_std().unwrap_or(StdDuration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(remaining.min(SLEEP_SLICE)) => {}
                    _ = stop_rx.changed() => {}
                }
            }
            tracing::info!("Cycle timer worker exited");
        });
        Self {
            stop_tx,
            worker: Some(worker),
        }
    }

    /// Signal the worker to stop, then join it with a bounded wait.
    ///
    /// Returns an error if the worker has not exited in time; calling
    /// `stop()` again retries the join, and callers should retry until
    /// `Ok` rather than leak the worker. Once the worker is gone further
    /// calls are no-ops.
    pub async fn stop(&mut self) -> Result<()> {
        let _ = self.stop_tx.send(true);
        let Some(worker) = self.worker.as_mut() else {
            return Ok(());
        };
        match tokio::time::timeout(JOIN_TIMEOUT, worker).await {
            Ok(join) => {
                self.worker = None;
                join.map_err(|e| PhrasedropError::Scheduler(format!("timer worker failed: {e}")))
            }
            Err(_) => Err(PhrasedropError::Scheduler(
                "timer worker has not exited yet, retry stop()".into(),
            )),
        }
    }
}

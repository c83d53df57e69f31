//! Per-session status polling.
//!
//! One cancellable task per session. Ticks chain sequentially — the next
//! sleep starts only after the current request settles, so a slow backend
//! can never stack overlapping requests for one session. Stopping trips a
//! cancel flag and wakes the sleeper; an already in-flight request is left
//! to finish and its response goes through the manager's identity routing
//! like any other (soft cancellation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::session::{SessionManager, TickOutcome};

pub(crate) struct PollerHandle {
    cancel: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl SessionManager {
    /// Begin polling a session. No-op if the session is unknown, already
    /// terminal, or already being polled.
    pub fn start_polling(&self, job_id: &str) {
        let mut pollers = self.pollers_lock();
        if pollers.contains_key(job_id) {
            debug!(job_id, "Poller already running");
            return;
        }
        if self.poll_query(job_id).is_none() {
            debug!(job_id, "Not polling: session missing or already terminal");
            return;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        pollers.insert(
            job_id.to_string(),
            PollerHandle {
                cancel: cancel.clone(),
                wake: wake.clone(),
            },
        );
        drop(pollers);

        info!(job_id, "Polling started");
        let manager = self.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            manager.poll_loop(&job_id, &cancel, &wake).await;

            // Deregister, but only our own handle: a reset session may have
            // started a fresh poller under the same id.
            let mut pollers = manager.pollers_lock();
            if let Some(current) = pollers.get(&job_id) {
                if Arc::ptr_eq(&current.cancel, &cancel) {
                    pollers.remove(&job_id);
                }
            }
            debug!(job_id = job_id.as_str(), "Poller exited");
        });
    }

    /// Clear the pending timer and stop scheduling ticks for a session.
    pub fn stop_polling(&self, job_id: &str) {
        if let Some(handle) = self.pollers_lock().remove(job_id) {
            handle.cancel.store(true, Ordering::Relaxed);
            // notify_one stores a permit, so a sleeper that is not yet
            // awaiting still wakes immediately instead of finishing the
            // interval.
            handle.wake.notify_one();
            info!(job_id, "Polling stopped");
        }
    }

    async fn poll_loop(&self, job_id: &str, cancel: &AtomicBool, wake: &Notify) {
        loop {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            // Snapshot the tick's target id and cursor; the response is
            // routed back by id, never applied to whatever is "current".
            let Some(query) = self.poll_query(job_id) else {
                break;
            };

            let result = self.fetcher.fetch_status(&query).await;
            match self.apply_tick(job_id, result) {
                TickOutcome::Terminal => {
                    info!(job_id, "Polling reached terminal status");
                    break;
                }
                TickOutcome::Dropped => break,
                TickOutcome::Continue => {}
            }

            if cancel.load(Ordering::Relaxed) {
                break;
            }
            // Sequential chaining: the delay starts only after the tick
            // settled.
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = wake.notified() => {}
            }
        }
    }
}

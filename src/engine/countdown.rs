//! Wall-clock countdown. Remaining time is recomputed from the attempt's
//! `started_at` on every tick, so skipped ticks (tab throttling, a suspended
//! machine) cost display updates but never stretch the deadline.

use tokio::sync::watch;
use tokio::time::interval;

use crate::core::time::now_utc;
use crate::domain::types::AttemptStatus;
use crate::engine::AttemptEngine;

impl AttemptEngine {
    /// Auto-submits once the deadline has passed. The `auto_submit_started`
    /// flag makes the submit fire at most once even when several ticks observe
    /// zero remaining; it is cleared again on failure so a later tick retries.
    pub(crate) async fn try_auto_submit(&self) -> bool {
        let mut inner = self.lock().await;
        if inner.attempt.status != AttemptStatus::InProgress || inner.auto_submit_started {
            return false;
        }
        if self.remaining_seconds_locked(&inner, now_utc()) > 0 {
            return false;
        }

        inner.auto_submit_started = true;
        match self.submit_locked(&mut inner, false).await {
            Ok(_) => {
                metrics::counter!("examflow_auto_submit_total", "status" => "ok").increment(1);
                tracing::info!(attempt_id = %inner.attempt.id, "Attempt auto-submitted at deadline");
                true
            }
            Err(err) => {
                inner.auto_submit_started = false;
                metrics::counter!("examflow_auto_submit_total", "status" => "failed").increment(1);
                tracing::error!(
                    attempt_id = %inner.attempt.id,
                    error = %err,
                    "Auto-submit failed; retrying on the next tick"
                );
                false
            }
        }
    }
}

/// Ticks once per configured interval while the attempt is in progress and
/// triggers the auto-submit when the countdown reaches zero.
pub(crate) async fn countdown_loop(engine: AttemptEngine, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(engine.config().countdown_tick);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let remaining = {
                    let inner = engine.lock().await;
                    if inner.attempt.status != AttemptStatus::InProgress {
                        break;
                    }
                    engine.remaining_seconds_locked(&inner, now_utc())
                };
                metrics::gauge!("examflow_remaining_seconds").set(remaining as f64);

                if remaining <= 0 && engine.try_auto_submit().await {
                    break;
                }
            }
        }
    }
}

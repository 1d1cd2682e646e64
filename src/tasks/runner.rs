use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::{autosave, countdown, AttemptEngine};

/// Owns the background loops of one in-progress attempt: countdown,
/// debounced autosave, and time-spent sync. Dropping the runner without
/// calling [`AttemptRunner::shutdown`] aborts nothing; the loops also exit on
/// their own once the attempt leaves `InProgress`.
pub struct AttemptRunner {
    engine: AttemptEngine,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl AttemptRunner {
    /// Spawns the three loops for the given engine.
    pub fn spawn(engine: AttemptEngine) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = vec![
            tokio::spawn(countdown::countdown_loop(engine.clone(), shutdown_rx.clone())),
            tokio::spawn(autosave::autosave_loop(engine.clone(), shutdown_rx.clone())),
            tokio::spawn(autosave::time_sync_loop(engine.clone(), shutdown_rx)),
        ];

        Self { engine, shutdown_tx, handles }
    }

    pub fn engine(&self) -> &AttemptEngine {
        &self.engine
    }

    /// Stops the loops, waits for them, then runs one final forced flush so
    /// edits and accrued seconds survive leaving the attempt screen.
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            tracing::warn!("Failed to broadcast shutdown signal to attempt tasks");
        }

        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Attempt task join failed");
            }
        }

        self.engine.flush_all_pending().await;
    }
}

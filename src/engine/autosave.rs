//! Autosave and time-sync plumbing: the flush primitives on
//! [`AttemptEngine`] plus the background loops the runner spawns.

use tokio::sync::watch;
use tokio::time::{interval, Instant};

use crate::backend::SaveAnswerRequest;
use crate::domain::types::{AttemptStatus, SaveState};
use crate::engine::{AttemptEngine, EngineError, EngineInner};

impl AttemptEngine {
    /// Flushes one question's answer and records the outcome in the save
    /// indicator. Failures stay dirty; the autosave loop retries them.
    pub(crate) async fn flush_question(&self, inner: &mut EngineInner, question_id: &str) {
        inner.store.set_save_state(SaveState::Saving);
        match self.flush_one(inner, question_id).await {
            Ok(()) => inner.store.set_save_state(SaveState::Saved),
            Err(err) => {
                tracing::warn!(
                    attempt_id = %inner.attempt.id,
                    question_id,
                    error = %err,
                    "Answer save failed; will retry"
                );
                inner.store.set_save_state(SaveState::Failed);
            }
        }
    }

    async fn flush_one(
        &self,
        inner: &mut EngineInner,
        question_id: &str,
    ) -> Result<(), EngineError> {
        let Some(value) = inner.store.value_of(question_id).cloned() else {
            return Ok(());
        };
        let request = SaveAnswerRequest {
            attempt_id: inner.attempt.id.clone(),
            question_id: question_id.to_string(),
            value: value.clone(),
            existing_answer_id: inner.store.persisted_answer(question_id).map(|a| a.id.clone()),
        };

        match self.backend().save_answer(request).await {
            Ok(answer) => {
                inner.store.mark_flushed(question_id, answer, &value);
                metrics::counter!("examflow_autosave_total", "status" => "ok").increment(1);
                Ok(())
            }
            Err(err) => {
                metrics::counter!("examflow_autosave_total", "status" => "failed").increment(1);
                Err(err.into())
            }
        }
    }

    /// Flushes every due dirty answer. With `force` the debounce window is
    /// ignored, which is what submit and teardown need.
    pub(crate) async fn flush_dirty_locked(&self, inner: &mut EngineInner, force: bool) -> Result<(), EngineError> {
        let due = inner.store.due_for_flush(self.config().text_debounce, force);
        if due.is_empty() {
            return Ok(());
        }

        inner.store.set_save_state(SaveState::Saving);
        let mut first_error = None;
        for question_id in due {
            if let Err(err) = self.flush_one(inner, &question_id).await {
                tracing::warn!(
                    attempt_id = %inner.attempt.id,
                    question_id = %question_id,
                    error = %err,
                    "Answer save failed; will retry"
                );
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            None => {
                inner.store.set_save_state(SaveState::Saved);
                Ok(())
            }
            Some(err) => {
                inner.store.set_save_state(SaveState::Failed);
                Err(err)
            }
        }
    }

    /// Pushes accrued per-question time deltas to the backend. Committed only
    /// on acknowledgement, so a failed sync keeps the seconds for retry.
    pub(crate) async fn sync_time_locked(&self, inner: &mut EngineInner) -> Result<(), EngineError> {
        inner.store.accrue_focus_time(Instant::now());

        let mut first_error = None;
        for (question_id, delta) in inner.store.pending_time_deltas() {
            match self
                .backend()
                .update_time_spent(&inner.attempt.id, &question_id, delta)
                .await
            {
                Ok(()) => inner.store.commit_time_delta(&question_id, delta),
                Err(err) => {
                    tracing::warn!(
                        attempt_id = %inner.attempt.id,
                        question_id = %question_id,
                        delta_seconds = delta,
                        error = %err,
                        "Time-spent sync failed; will retry"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Force-flushes dirty answers and time deltas. Submit runs this first so
    /// nothing typed or timed is lost; an error here aborts the submit.
    pub(crate) async fn flush_pending_locked(
        &self,
        inner: &mut EngineInner,
        force: bool,
    ) -> Result<(), EngineError> {
        self.flush_dirty_locked(inner, force).await?;
        self.sync_time_locked(inner).await
    }

    /// Teardown flush: one forced, best-effort pass over dirty answers and
    /// time deltas. Called after the background loops have stopped.
    pub async fn flush_all_pending(&self) {
        let mut inner = self.lock().await;
        if inner.attempt.status != AttemptStatus::InProgress {
            return;
        }
        if let Err(err) = self.flush_pending_locked(&mut inner, true).await {
            tracing::warn!(
                attempt_id = %inner.attempt.id,
                error = %err,
                "Final flush left unsaved work behind"
            );
        }
    }
}

/// Polls for dirty answers whose debounce window has elapsed and flushes
/// them. Exits when the attempt leaves `InProgress`.
pub(crate) async fn autosave_loop(engine: AttemptEngine, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(engine.config().autosave_poll);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let mut inner = engine.lock().await;
                if inner.attempt.status != AttemptStatus::InProgress {
                    break;
                }
                // Errors are already logged and the entries stay dirty.
                let _ = engine.flush_dirty_locked(&mut inner, false).await;
            }
        }
    }
}

/// Periodically pushes accrued time-spent deltas to the backend. Exits when
/// the attempt leaves `InProgress`.
pub(crate) async fn time_sync_loop(engine: AttemptEngine, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(engine.config().time_sync_interval);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let mut inner = engine.lock().await;
                if inner.attempt.status != AttemptStatus::InProgress {
                    break;
                }
                let _ = engine.sync_time_locked(&mut inner).await;
            }
        }
    }
}

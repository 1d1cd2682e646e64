pub(crate) mod answers;
pub(crate) mod autosave;
pub(crate) mod countdown;
mod errors;


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::backend::AttemptBackend;
use crate::core::config::Settings;
use crate::core::time::{format_offset, now_utc};
use crate::domain::models::{AnswerValue, Attempt, Exam, QuestionBody};
use crate::domain::types::{AccessType, AttemptStatus, SaveState};
use crate::engine::answers::AnswerStore;
use crate::services::{attempt_timing, scoring};

pub use errors::EngineError;

/// Timer/flush knobs, extracted from [`Settings`] so the engine and its
/// runner never reach back into the environment.
#[derive(Debug, Clone)]
pub(crate) struct EngineConfig {
    pub(crate) countdown_tick: Duration,
    pub(crate) text_debounce: Duration,
    pub(crate) autosave_poll: Duration,
    pub(crate) time_sync_interval: Duration,
    pub(crate) submit_grace_seconds: i64,
}

impl EngineConfig {
    fn from_settings(settings: &Settings) -> Self {
        let attempt = settings.attempt();
        Self {
            countdown_tick: Duration::from_millis(attempt.countdown_tick_millis),
            text_debounce: Duration::from_millis(attempt.text_debounce_millis),
            autosave_poll: Duration::from_millis(attempt.autosave_poll_millis),
            time_sync_interval: Duration::from_secs(attempt.time_sync_interval_seconds),
            submit_grace_seconds: attempt.submit_grace_seconds,
        }
    }
}

pub(crate) struct EngineInner {
    pub(crate) attempt: Attempt,
    pub(crate) store: AnswerStore,
    /// Auto-submit idempotency guard: set before the countdown's submit call,
    /// cleared again only if that call fails so a later tick can retry.
    pub(crate) auto_submit_started: bool,
}

/// The attempt state machine. One engine per attempt; cloning the handle is
/// cheap and every clone sees the same state. All mutation happens under one
/// async mutex, which is what serializes autosave flushes against submit.
#[derive(Clone)]
pub struct AttemptEngine {
    inner: Arc<Mutex<EngineInner>>,
    backend: Arc<dyn AttemptBackend>,
    exam: Arc<Exam>,
    config: EngineConfig,
}

/// Read-only copy of the attempt state for the navigation/review layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AttemptSnapshot {
    pub attempt: Attempt,
    pub exam: Arc<Exam>,
    /// Current value per answered question, including edits not yet flushed.
    pub answers: HashMap<String, AnswerView>,
    pub save_state: SaveState,
    pub remaining_seconds: i64,
}

/// One question's answer as the UI should render it: the in-memory value
/// (which may still be dirty) plus marks from the persisted record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnswerView {
    pub question_id: String,
    pub value: AnswerValue,
    pub time_spent_seconds: i64,
    pub marks: Option<f64>,
    pub persisted: bool,
}

impl AttemptSnapshot {
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|view| view.value.is_substantive()).count()
    }
}

impl AttemptEngine {
    /// Starts a fresh attempt. Fails with [`EngineError::AccessDenied`] when
    /// the backend rejects the entitlement and with
    /// [`EngineError::DuplicateAttempt`] when one is already in progress;
    /// callers should resume the existing attempt in that case.
    pub async fn start(
        backend: Arc<dyn AttemptBackend>,
        settings: &Settings,
        exam: Arc<Exam>,
        access: AccessType,
        enrollment_ref: Option<&str>,
    ) -> Result<Self, EngineError> {
        let attempt = backend.start_attempt(&exam.id, access, enrollment_ref).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            exam_id = %exam.id,
            access = ?access,
            "Attempt started"
        );

        Ok(Self::assemble(backend, settings, exam, attempt, Vec::new()))
    }

    /// Rebuilds an engine for an existing attempt, e.g. after a reload. The
    /// wall-clock countdown survives this because remaining time derives from
    /// the stored `started_at`, not a local counter.
    pub async fn resume(
        backend: Arc<dyn AttemptBackend>,
        settings: &Settings,
        exam: Arc<Exam>,
        attempt_id: &str,
    ) -> Result<Self, EngineError> {
        let (attempt, answers) = backend.load_attempt(attempt_id).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            status = %attempt.status,
            started_at = %format_offset(attempt.started_at),
            answers = answers.len(),
            "Attempt resumed"
        );

        Ok(Self::assemble(backend, settings, exam, attempt, answers))
    }

    fn assemble(
        backend: Arc<dyn AttemptBackend>,
        settings: &Settings,
        exam: Arc<Exam>,
        attempt: Attempt,
        answers: Vec<crate::domain::models::Answer>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                attempt,
                store: AnswerStore::new(answers),
                auto_submit_started: false,
            })),
            backend,
            exam,
            config: EngineConfig::from_settings(settings),
        }
    }

    pub fn exam(&self) -> Arc<Exam> {
        Arc::clone(&self.exam)
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn backend(&self) -> &Arc<dyn AttemptBackend> {
        &self.backend
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, EngineInner> {
        self.inner.lock().await
    }

    pub async fn status(&self) -> AttemptStatus {
        self.inner.lock().await.attempt.status
    }

    pub async fn save_state(&self) -> SaveState {
        self.inner.lock().await.store.save_state()
    }

    /// True while an edit has not yet been acknowledged by the backend. UIs
    /// use this to warn before the user leaves the attempt screen.
    pub async fn has_unsaved_changes(&self) -> bool {
        self.inner.lock().await.store.has_dirty()
    }

    /// Seconds left on the countdown, recomputed from absolute time.
    pub async fn remaining_seconds(&self) -> i64 {
        let inner = self.inner.lock().await;
        self.remaining_seconds_locked(&inner, now_utc())
    }

    pub(crate) fn remaining_seconds_locked(
        &self,
        inner: &EngineInner,
        now: OffsetDateTime,
    ) -> i64 {
        if inner.attempt.status != AttemptStatus::InProgress {
            return 0;
        }
        attempt_timing::remaining_seconds(
            inner.attempt.started_at,
            self.exam.duration_minutes,
            now,
        )
    }

    /// Records an MCQ selection and saves it immediately (discrete event, no
    /// debounce). A failed save keeps the value dirty for the autosave loop;
    /// the returned state tells the UI which indicator to show.
    pub async fn select_option(
        &self,
        question_id: &str,
        option_index: usize,
    ) -> Result<SaveState, EngineError> {
        let mut inner = self.inner.lock().await;
        self.ensure_in_progress(&inner, "select_option")?;

        let question = self
            .exam
            .question(question_id)
            .ok_or_else(|| EngineError::NotFound(format!("question {question_id}")))?;
        match &question.body {
            QuestionBody::MultipleChoice { options, .. } => {
                if option_index >= options.len() {
                    return Err(EngineError::Validation(format!(
                        "option {option_index} is out of range for question {question_id}"
                    )));
                }
            }
            QuestionBody::Descriptive { .. } => {
                return Err(EngineError::Validation(format!(
                    "question {question_id} does not take an option selection"
                )));
            }
        }

        inner.store.set_selected(question_id, option_index);
        self.flush_question(&mut inner, question_id).await;
        Ok(inner.store.save_state())
    }

    /// Records a free-text edit; the autosave loop flushes it after the
    /// debounce quiet period.
    pub async fn edit_text(&self, question_id: &str, text: String) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        self.ensure_in_progress(&inner, "edit_text")?;

        let question = self
            .exam
            .question(question_id)
            .ok_or_else(|| EngineError::NotFound(format!("question {question_id}")))?;
        match &question.body {
            QuestionBody::Descriptive { word_limit, .. } => {
                if let Some(limit) = word_limit {
                    let words = text.split_whitespace().count();
                    if words > *limit as usize {
                        return Err(EngineError::Validation(format!(
                            "answer exceeds the {limit}-word limit ({words} words)"
                        )));
                    }
                }
            }
            QuestionBody::MultipleChoice { .. } => {
                return Err(EngineError::Validation(format!(
                    "question {question_id} does not take free text"
                )));
            }
        }

        inner.store.set_text(question_id, text);
        Ok(())
    }

    /// Moves the time-spent accumulator to the given question.
    pub async fn focus_question(&self, question_id: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().await;
        self.ensure_in_progress(&inner, "focus_question")?;
        if self.exam.question(question_id).is_none() {
            return Err(EngineError::NotFound(format!("question {question_id}")));
        }
        inner.store.focus(question_id);
        Ok(())
    }

    /// Submits the attempt. Ordering guarantee: every dirty answer and every
    /// pending time delta is flushed *before* the backend submit call and
    /// before the status changes; a flush failure aborts the submit and
    /// leaves the attempt `InProgress` for a retry.
    pub async fn submit(&self) -> Result<Attempt, EngineError> {
        let mut inner = self.inner.lock().await;
        self.submit_locked(&mut inner, true).await
    }

    /// `enforce_deadline` is false for the countdown's auto-submit, which
    /// fires *because* the deadline passed and must not be rejected by it.
    pub(crate) async fn submit_locked(
        &self,
        inner: &mut EngineInner,
        enforce_deadline: bool,
    ) -> Result<Attempt, EngineError> {
        self.ensure_in_progress(inner, "submit")?;

        let now = now_utc();
        if enforce_deadline
            && !attempt_timing::within_submit_grace(
                inner.attempt.started_at,
                self.exam.duration_minutes,
                self.config.submit_grace_seconds,
                now,
            )
        {
            return Err(EngineError::DeadlinePassed);
        }

        self.flush_pending_locked(inner, true).await?;

        let attempt_id = inner.attempt.id.clone();
        let submitted = self.backend.submit_attempt(&attempt_id).await?;
        inner.attempt.status = AttemptStatus::Submitted;
        inner.attempt.submitted_at = submitted.submitted_at.or(Some(now));
        inner.store.clear_focus();
        tracing::info!(attempt_id = %attempt_id, "Attempt submitted");

        if self.exam.is_auto_gradable() {
            // MCQ-only exams finish without a grader. An evaluation failure
            // leaves the attempt Submitted; a manual evaluate can retry.
            if let Err(err) = self.evaluate_locked(inner, AttemptStatus::Completed).await {
                tracing::warn!(
                    attempt_id = %inner.attempt.id,
                    error = %err,
                    "Auto-evaluation failed; attempt remains submitted"
                );
            }
        }

        Ok(inner.attempt.clone())
    }

    /// Scores a submitted attempt. Valid only from `Submitted`; terminal
    /// status is `Evaluated`.
    pub async fn evaluate(&self) -> Result<Attempt, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.attempt.status != AttemptStatus::Submitted {
            return Err(EngineError::InvalidStateTransition {
                from: inner.attempt.status,
                operation: "evaluate",
            });
        }
        self.evaluate_locked(&mut inner, AttemptStatus::Evaluated).await?;
        Ok(inner.attempt.clone())
    }

    async fn evaluate_locked(
        &self,
        inner: &mut EngineInner,
        terminal: AttemptStatus,
    ) -> Result<(), EngineError> {
        debug_assert!(inner.attempt.status.can_transition_to(terminal));

        let answers = inner.store.persisted_map();
        let summary = scoring::evaluate(&self.exam, &answers);

        self.backend.evaluate_attempt(&inner.attempt.id).await?;

        for (question_id, marks) in &summary.marks {
            inner.store.set_marks(question_id, *marks);
        }
        inner.attempt.score = Some(summary.score);
        inner.attempt.max_score = summary.max_score;
        inner.attempt.percentage = Some(summary.percentage);
        inner.attempt.correct_answers = summary.correct_answers;
        inner.attempt.incorrect_answers = summary.incorrect_answers;
        inner.attempt.accuracy = summary.accuracy;
        inner.attempt.status = terminal;

        tracing::info!(
            attempt_id = %inner.attempt.id,
            score = summary.score,
            max_score = summary.max_score,
            status = %terminal,
            "Attempt evaluated"
        );
        Ok(())
    }

    /// Snapshot for the read-only navigation/review layer.
    pub async fn snapshot(&self) -> AttemptSnapshot {
        let inner = self.inner.lock().await;
        let answers = inner
            .store
            .entries()
            .filter_map(|(question_id, entry)| {
                entry.value.clone().map(|value| {
                    let persisted = entry.persisted.as_ref();
                    (
                        question_id.clone(),
                        AnswerView {
                            question_id: question_id.clone(),
                            value,
                            time_spent_seconds: persisted
                                .map(|answer| answer.time_spent_seconds)
                                .unwrap_or(0)
                                + entry.pending_seconds,
                            marks: persisted.and_then(|answer| answer.marks),
                            persisted: persisted.is_some(),
                        },
                    )
                })
            })
            .collect();

        AttemptSnapshot {
            attempt: inner.attempt.clone(),
            exam: Arc::clone(&self.exam),
            answers,
            save_state: inner.store.save_state(),
            remaining_seconds: self.remaining_seconds_locked(&inner, now_utc()),
        }
    }

    fn ensure_in_progress(
        &self,
        inner: &EngineInner,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        if inner.attempt.status != AttemptStatus::InProgress {
            return Err(EngineError::InvalidStateTransition {
                from: inner.attempt.status,
                operation,
            });
        }
        Ok(())
    }
}

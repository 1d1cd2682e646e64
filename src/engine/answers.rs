use std::collections::HashMap;

use tokio::time::Instant;

use crate::domain::models::{Answer, AnswerValue};
use crate::domain::types::SaveState;

/// Per-question cache entry: the last persisted answer plus the current
/// in-memory value and its dirty/debounce bookkeeping.
#[derive(Debug)]
pub(crate) struct AnswerEntry {
    /// Last answer acknowledged by the backend, if any.
    pub(crate) persisted: Option<Answer>,
    pub(crate) value: Option<AnswerValue>,
    pub(crate) dirty: bool,
    /// Set on MCQ selection: flush on the next cycle without waiting for the
    /// debounce window.
    pub(crate) immediate: bool,
    /// Debounce anchor; refreshed on every text keystroke.
    pub(crate) last_edit: Option<Instant>,
    /// Seconds spent on this question not yet flushed to the backend.
    pub(crate) pending_seconds: i64,
}

impl AnswerEntry {
    fn empty() -> Self {
        Self { persisted: None, value: None, dirty: false, immediate: false, last_edit: None, pending_seconds: 0 }
    }

    fn from_persisted(answer: Answer) -> Self {
        Self {
            value: Some(answer.value.clone()),
            persisted: Some(answer),
            dirty: false,
            immediate: false,
            last_edit: None,
            pending_seconds: 0,
        }
    }
}

#[derive(Debug)]
struct Focus {
    question_id: String,
    anchor: Instant,
}

/// Single source of truth for the attempt's answers. Owned by the engine and
/// mutated only under its lock; the navigation/review layer sees copies.
#[derive(Debug)]
pub(crate) struct AnswerStore {
    entries: HashMap<String, AnswerEntry>,
    focus: Option<Focus>,
    save_state: SaveState,
}

impl AnswerStore {
    pub(crate) fn new(persisted: Vec<Answer>) -> Self {
        let entries = persisted
            .into_iter()
            .map(|answer| (answer.question_id.clone(), AnswerEntry::from_persisted(answer)))
            .collect();
        Self { entries, focus: None, save_state: SaveState::Idle }
    }

    pub(crate) fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub(crate) fn set_save_state(&mut self, state: SaveState) {
        self.save_state = state;
    }

    /// Records an MCQ selection; flushed immediately, no debounce.
    pub(crate) fn set_selected(&mut self, question_id: &str, option_index: usize) {
        let entry = self.entry_mut(question_id);
        entry.value = Some(AnswerValue::Selected(option_index));
        entry.dirty = true;
        entry.immediate = true;
        entry.last_edit = None;
    }

    /// Records a text edit and restarts its debounce window.
    pub(crate) fn set_text(&mut self, question_id: &str, text: String) {
        let entry = self.entry_mut(question_id);
        entry.value = Some(AnswerValue::Text(text));
        entry.dirty = true;
        entry.last_edit = Some(Instant::now());
    }

    /// Moves the time accumulator to `question_id`, crediting whole seconds
    /// spent on the previously focused question.
    pub(crate) fn focus(&mut self, question_id: &str) {
        let now = Instant::now();
        self.accrue_focus_time(now);
        self.focus = Some(Focus { question_id: question_id.to_string(), anchor: now });
    }

    pub(crate) fn clear_focus(&mut self) {
        self.accrue_focus_time(Instant::now());
        self.focus = None;
    }

    /// Credits elapsed whole seconds on the focused question to its pending
    /// delta, advancing the anchor so fractions are never double counted.
    pub(crate) fn accrue_focus_time(&mut self, now: Instant) {
        let Some(focus) = self.focus.as_mut() else {
            return;
        };
        let elapsed = now.saturating_duration_since(focus.anchor).as_secs();
        if elapsed == 0 {
            return;
        }
        focus.anchor += std::time::Duration::from_secs(elapsed);
        let question_id = focus.question_id.clone();
        self.entry_mut(&question_id).pending_seconds += elapsed as i64;
    }

    /// Question ids whose edits are due for a flush: MCQ selections always,
    /// text edits once their quiet period has elapsed (or when forced, e.g.
    /// before submit or on teardown).
    pub(crate) fn due_for_flush(&self, debounce: std::time::Duration, force: bool) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, entry)| {
                entry.dirty
                    && (force
                        || entry.immediate
                        || entry
                            .last_edit
                            .is_some_and(|edit| now.saturating_duration_since(edit) >= debounce))
            })
            .map(|(question_id, _)| question_id.clone())
            .collect()
    }

    pub(crate) fn has_dirty(&self) -> bool {
        self.entries.values().any(|entry| entry.dirty)
    }

    pub(crate) fn value_of(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entries.get(question_id).and_then(|entry| entry.value.as_ref())
    }

    pub(crate) fn persisted_answer(&self, question_id: &str) -> Option<&Answer> {
        self.entries.get(question_id).and_then(|entry| entry.persisted.as_ref())
    }

    /// Marks a flush as acknowledged, keeping the entry dirty if the user
    /// edited again while the request was in flight.
    pub(crate) fn mark_flushed(&mut self, question_id: &str, answer: Answer, sent: &AnswerValue) {
        let entry = self.entry_mut(question_id);
        entry.persisted = Some(answer);
        if entry.value.as_ref() == Some(sent) {
            entry.dirty = false;
            entry.immediate = false;
            entry.last_edit = None;
        }
    }

    /// Time-spent deltas of at least one whole second, ready to sync. Time is
    /// attributed per answer row, so deltas for questions without a persisted
    /// answer are held back and released once the first save lands.
    pub(crate) fn pending_time_deltas(&self) -> Vec<(String, i64)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.persisted.is_some() && entry.pending_seconds >= 1)
            .map(|(question_id, entry)| (question_id.clone(), entry.pending_seconds))
            .collect()
    }

    /// Commits an acknowledged time-spent delta: resets the local accumulator
    /// and folds the delta into the persisted answer, if one exists.
    pub(crate) fn commit_time_delta(&mut self, question_id: &str, delta_seconds: i64) {
        let entry = self.entry_mut(question_id);
        entry.pending_seconds -= delta_seconds;
        if let Some(answer) = entry.persisted.as_mut() {
            answer.time_spent_seconds += delta_seconds;
        }
    }

    /// Answers as acknowledged by the backend, keyed by question id. This is
    /// what evaluation scores; flush-before-submit guarantees it is current.
    pub(crate) fn persisted_map(&self) -> HashMap<String, Answer> {
        self.entries
            .iter()
            .filter_map(|(question_id, entry)| {
                entry.persisted.clone().map(|answer| (question_id.clone(), answer))
            })
            .collect()
    }

    pub(crate) fn set_marks(&mut self, question_id: &str, marks: f64) {
        if let Some(answer) =
            self.entries.get_mut(question_id).and_then(|entry| entry.persisted.as_mut())
        {
            answer.marks = Some(marks);
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &AnswerEntry)> {
        self.entries.iter()
    }

    fn entry_mut(&mut self, question_id: &str) -> &mut AnswerEntry {
        self.entries.entry(question_id.to_string()).or_insert_with(AnswerEntry::empty)
    }
}

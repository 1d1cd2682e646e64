use std::sync::Arc;

use crate::domain::models::{Exam, Question};
use crate::engine::AttemptSnapshot;

/// Cursor over the exam's question list. Purely positional; answer state
/// lives in the engine and is read through snapshots.
#[derive(Debug, Clone)]
pub struct Navigator {
    exam: Arc<Exam>,
    current: usize,
}

/// Answered-question progress for the palette header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Navigator {
    pub fn new(exam: Arc<Exam>) -> Self {
        Self { exam, current: 0 }
    }

    /// `None` only for an exam with no questions.
    pub fn current_question(&self) -> Option<&Question> {
        self.exam.questions.get(self.current)
    }

    /// Zero-based position and total, for a "question 3 of 20" display.
    pub fn position(&self) -> (usize, usize) {
        (self.current, self.exam.questions.len())
    }

    /// Advances to the next question. Bounded: stays put and returns false on
    /// the last question, no wraparound.
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.exam.questions.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Steps back one question; false on the first.
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jumps straight to a question by id, e.g. from the palette. False when
    /// the id is not part of this exam.
    pub fn jump_to(&mut self, question_id: &str) -> bool {
        match self.exam.question_index(question_id) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn progress(&self, snapshot: &AttemptSnapshot) -> Progress {
        Progress { answered: snapshot.answered_count(), total: self.exam.questions.len() }
    }
}

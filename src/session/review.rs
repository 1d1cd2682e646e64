use serde::Serialize;

use crate::domain::models::{Question, QuestionBody};
use crate::engine::{AnswerView, AttemptSnapshot};
use crate::services::scoring;

/// Per-question verdict on the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Correct,
    Incorrect,
    /// No substantive answer was recorded.
    Unattempted,
    /// Answered, but with no automatic notion of correctness (descriptive
    /// questions awaiting or carrying manual marks).
    Attempted,
}

/// One row of the review screen.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub question_id: String,
    pub outcome: ReviewOutcome,
    pub marks: Option<f64>,
    pub time_spent_seconds: i64,
}

/// Classifies a single question against the recorded answer, if any.
pub fn classify(question: &Question, answer: Option<&AnswerView>) -> ReviewOutcome {
    let Some(answer) = answer.filter(|view| view.value.is_substantive()) else {
        return ReviewOutcome::Unattempted;
    };
    match scoring::is_correct(&question.body, &answer.value) {
        Some(true) => ReviewOutcome::Correct,
        Some(false) => ReviewOutcome::Incorrect,
        None => ReviewOutcome::Attempted,
    }
}

/// Builds the review list in exam question order.
pub fn review_items(snapshot: &AttemptSnapshot) -> Vec<ReviewItem> {
    snapshot
        .exam
        .questions
        .iter()
        .map(|question| {
            let answer = snapshot.answers.get(&question.id);
            ReviewItem {
                question_id: question.id.clone(),
                outcome: classify(question, answer),
                marks: answer.and_then(|view| view.marks),
                time_spent_seconds: answer.map(|view| view.time_spent_seconds).unwrap_or(0),
            }
        })
        .collect()
}

/// Review list restricted to one outcome, for the "incorrect only" style
/// filters.
pub fn filtered(snapshot: &AttemptSnapshot, outcome: ReviewOutcome) -> Vec<ReviewItem> {
    review_items(snapshot).into_iter().filter(|item| item.outcome == outcome).collect()
}

/// The correct option index, shown on review for evaluated attempts.
pub fn correct_option(question: &Question) -> Option<usize> {
    match &question.body {
        QuestionBody::MultipleChoice { correct_option, .. } => Some(*correct_option),
        QuestionBody::Descriptive { .. } => None,
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::AttemptStatus;

/// Marking scheme shared by every MCQ question of an exam.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkingScheme {
    pub correct_mark: f64,
    pub incorrect_mark: f64,
    pub negative_marking: bool,
}

/// Immutable exam definition. Attempts hold it behind an `Arc` and never
/// mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub duration_minutes: i64,
    pub marking: MarkingScheme,
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    pub fn question_index(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == question_id)
    }

    /// Highest reachable score: correct mark per MCQ plus descriptive maxima.
    pub fn max_score(&self) -> f64 {
        self.questions
            .iter()
            .map(|question| match &question.body {
                QuestionBody::MultipleChoice { .. } => self.marking.correct_mark,
                QuestionBody::Descriptive { max_marks, .. } => *max_marks,
            })
            .sum()
    }

    /// MCQ-only exams can be evaluated without a human grader.
    pub fn is_auto_gradable(&self) -> bool {
        self.questions
            .iter()
            .all(|question| matches!(question.body, QuestionBody::MultipleChoice { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub body: QuestionBody,
}

/// Question variants. Dispatch is an exhaustive `match`; adding a variant is a
/// compile error everywhere it matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    MultipleChoice {
        options: Vec<String>,
        correct_option: usize,
    },
    Descriptive {
        word_limit: Option<u32>,
        model_answer: Option<String>,
        max_marks: f64,
    },
}

/// One user's timed instance of taking an exam. The central mutable entity:
/// once `status` leaves `InProgress` no answer may change and the timer stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub exam_id: String,
    pub user_id: String,
    pub status: AttemptStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    pub score: Option<f64>,
    pub max_score: f64,
    /// Unclamped; negative marking can drive this below zero.
    pub percentage: Option<f64>,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub accuracy: Option<f64>,
    pub time_spent_seconds: i64,
}

impl Attempt {
    /// Clamped to [0, 100] for display; `percentage` keeps the audit value.
    pub fn display_percentage(&self) -> Option<f64> {
        self.percentage.map(|value| value.clamp(0.0, 100.0))
    }
}

/// Stored response, unique per (attempt_id, question_id). Saves are upserts:
/// a second save for the same question updates this record in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    #[serde(flatten)]
    pub value: AnswerValue,
    pub time_spent_seconds: i64,
    /// Assigned during evaluation (MCQ) or out-of-band grading (descriptive).
    pub marks: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    /// Index into the question's option list.
    Selected(usize),
    Text(String),
}

impl AnswerValue {
    pub fn as_selected(&self) -> Option<usize> {
        match self {
            AnswerValue::Selected(index) => Some(*index),
            AnswerValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::Selected(_) => None,
        }
    }

    /// Blank text counts as unattempted for progress and review purposes.
    pub fn is_substantive(&self) -> bool {
        match self {
            AnswerValue::Selected(_) => true,
            AnswerValue::Text(text) => !text.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(id: &str, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("question {id}"),
            body: QuestionBody::MultipleChoice {
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_option: correct,
            },
        }
    }

    fn descriptive(id: &str, max_marks: f64) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("question {id}"),
            body: QuestionBody::Descriptive { word_limit: Some(200), model_answer: None, max_marks },
        }
    }

    fn exam(questions: Vec<Question>) -> Exam {
        Exam {
            id: "exam-1".to_string(),
            title: "Sample".to_string(),
            duration_minutes: 60,
            marking: MarkingScheme { correct_mark: 2.0, incorrect_mark: 0.5, negative_marking: true },
            questions,
        }
    }

    #[test]
    fn max_score_mixes_mcq_and_descriptive() {
        let exam = exam(vec![mcq("q1", 0), mcq("q2", 1), descriptive("q3", 5.0)]);
        assert_eq!(exam.max_score(), 9.0);
    }

    #[test]
    fn auto_gradable_only_without_descriptive() {
        assert!(exam(vec![mcq("q1", 0)]).is_auto_gradable());
        assert!(!exam(vec![mcq("q1", 0), descriptive("q2", 5.0)]).is_auto_gradable());
    }

    #[test]
    fn display_percentage_clamps_negative_totals() {
        let attempt = Attempt {
            id: "a1".to_string(),
            exam_id: "exam-1".to_string(),
            user_id: "u1".to_string(),
            status: AttemptStatus::Evaluated,
            started_at: OffsetDateTime::now_utc(),
            submitted_at: None,
            score: Some(-1.0),
            max_score: 4.0,
            percentage: Some(-25.0),
            correct_answers: 0,
            incorrect_answers: 2,
            accuracy: Some(0.0),
            time_spent_seconds: 0,
        };
        assert_eq!(attempt.percentage, Some(-25.0));
        assert_eq!(attempt.display_percentage(), Some(0.0));
    }

    #[test]
    fn blank_text_is_not_substantive() {
        assert!(!AnswerValue::Text("   ".to_string()).is_substantive());
        assert!(AnswerValue::Text("ionic bond".to_string()).is_substantive());
        assert!(AnswerValue::Selected(0).is_substantive());
    }
}

use std::collections::HashMap;

use crate::domain::models::{Answer, AnswerValue, Exam, QuestionBody};

/// Result of the evaluation pass over a submitted attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub score: f64,
    pub max_score: f64,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub unattempted: u32,
    /// Unclamped; negative marking may take it below zero.
    pub percentage: f64,
    /// correct / attempted, over MCQ questions only; `None` when nothing was
    /// attempted.
    pub accuracy: Option<f64>,
    /// Marks assigned per question id, for writing back onto the answers.
    pub marks: HashMap<String, f64>,
}

/// Scores an attempt against its exam. MCQ answers are compared with the
/// question's correct option; descriptive answers carry whatever marks were
/// assigned out-of-band, or zero if none were.
pub fn evaluate(exam: &Exam, answers: &HashMap<String, Answer>) -> ScoreSummary {
    let mut score = 0.0;
    let mut correct = 0u32;
    let mut incorrect = 0u32;
    let mut unattempted = 0u32;
    let mut marks = HashMap::new();

    for question in &exam.questions {
        let answer = answers.get(&question.id).filter(|answer| answer.value.is_substantive());

        match &question.body {
            QuestionBody::MultipleChoice { correct_option, .. } => match answer {
                Some(answer) if answer.value.as_selected() == Some(*correct_option) => {
                    correct += 1;
                    score += exam.marking.correct_mark;
                    marks.insert(question.id.clone(), exam.marking.correct_mark);
                }
                Some(_) => {
                    incorrect += 1;
                    let penalty = if exam.marking.negative_marking {
                        -exam.marking.incorrect_mark
                    } else {
                        0.0
                    };
                    score += penalty;
                    marks.insert(question.id.clone(), penalty);
                }
                None => unattempted += 1,
            },
            QuestionBody::Descriptive { max_marks, .. } => match answer {
                Some(answer) => {
                    let assigned = answer.marks.unwrap_or(0.0).min(*max_marks);
                    score += assigned;
                    marks.insert(question.id.clone(), assigned);
                }
                None => unattempted += 1,
            },
        }
    }

    let max_score = exam.max_score();
    let percentage = if max_score > 0.0 { score / max_score * 100.0 } else { 0.0 };
    let attempted = correct + incorrect;
    let accuracy =
        (attempted > 0).then(|| f64::from(correct) / f64::from(attempted) * 100.0);

    ScoreSummary {
        score,
        max_score,
        correct_answers: correct,
        incorrect_answers: incorrect,
        unattempted,
        percentage,
        accuracy,
        marks,
    }
}

/// True when the answer selects the question's correct option. Descriptive
/// questions have no automatic notion of correctness.
pub fn is_correct(body: &QuestionBody, value: &AnswerValue) -> Option<bool> {
    match body {
        QuestionBody::MultipleChoice { correct_option, .. } => {
            Some(value.as_selected() == Some(*correct_option))
        }
        QuestionBody::Descriptive { .. } => None,
    }
}

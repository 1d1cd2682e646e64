//! Shared fixtures for in-crate tests: a scriptable in-memory stand-in for
//! the REST backend plus exam builders.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::Duration;

use crate::backend::{AttemptBackend, BackendError, SaveAnswerRequest};
use crate::core::time::now_utc;
use crate::domain::models::{Answer, Attempt, Exam, MarkingScheme, Question, QuestionBody};
use crate::domain::types::{AccessType, AttemptStatus};

pub(crate) fn mcq_question(id: &str, correct_option: usize) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("question {id}"),
        body: QuestionBody::MultipleChoice {
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option,
        },
    }
}

pub(crate) fn descriptive_question(id: &str, word_limit: Option<u32>, max_marks: f64) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("question {id}"),
        body: QuestionBody::Descriptive { word_limit, model_answer: None, max_marks },
    }
}

pub(crate) fn mcq_exam(duration_minutes: i64) -> Exam {
    Exam {
        id: "exam-1".to_string(),
        title: "Chemistry mock".to_string(),
        duration_minutes,
        marking: MarkingScheme { correct_mark: 2.0, incorrect_mark: 0.5, negative_marking: true },
        questions: vec![mcq_question("q1", 1), mcq_question("q2", 2), mcq_question("q3", 0)],
    }
}

pub(crate) fn mixed_exam(duration_minutes: i64) -> Exam {
    let mut exam = mcq_exam(duration_minutes);
    exam.questions.push(descriptive_question("q4", Some(100), 5.0));
    exam
}

#[derive(Default)]
struct BackendState {
    attempt: Option<Attempt>,
    answers: HashMap<String, Answer>,
    calls: Vec<String>,
    next_answer_id: u64,
    fail_next_saves: u32,
    fail_next_submits: u32,
    fail_next_time_syncs: u32,
    /// Shifts `started_at` into the past so deadline paths are reachable
    /// without waiting out the wall clock.
    started_minutes_ago: i64,
}

/// In-memory [`AttemptBackend`] with the same upsert and state-machine rules
/// as the real one. Failures are scripted per call; every call is recorded so
/// tests can assert ordering.
pub(crate) struct InMemoryBackend {
    state: Mutex<BackendState>,
}

impl InMemoryBackend {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(BackendState::default()) }
    }

    pub(crate) fn started_minutes_ago(self, minutes: i64) -> Self {
        self.state.lock().unwrap().started_minutes_ago = minutes;
        self
    }

    pub(crate) fn fail_next_saves(&self, count: u32) {
        self.state.lock().unwrap().fail_next_saves = count;
    }

    pub(crate) fn fail_next_submits(&self, count: u32) {
        self.state.lock().unwrap().fail_next_submits = count;
    }

    pub(crate) fn fail_next_time_syncs(&self, count: u32) {
        self.state.lock().unwrap().fail_next_time_syncs = count;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn stored_answers(&self) -> HashMap<String, Answer> {
        self.state.lock().unwrap().answers.clone()
    }

    pub(crate) fn stored_attempt(&self) -> Option<Attempt> {
        self.state.lock().unwrap().attempt.clone()
    }

    fn network_error(what: &str) -> BackendError {
        BackendError::Network(anyhow::anyhow!("simulated {what} failure"))
    }
}

#[async_trait]
impl AttemptBackend for InMemoryBackend {
    async fn start_attempt(
        &self,
        exam_id: &str,
        _access: AccessType,
        _enrollment_ref: Option<&str>,
    ) -> Result<Attempt, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start:{exam_id}"));

        if state
            .attempt
            .as_ref()
            .is_some_and(|attempt| attempt.status == AttemptStatus::InProgress)
        {
            return Err(BackendError::Conflict);
        }

        let attempt = Attempt {
            id: "att-1".to_string(),
            exam_id: exam_id.to_string(),
            user_id: "user-1".to_string(),
            status: AttemptStatus::InProgress,
            started_at: now_utc() - Duration::minutes(state.started_minutes_ago),
            submitted_at: None,
            score: None,
            max_score: 0.0,
            percentage: None,
            correct_answers: 0,
            incorrect_answers: 0,
            accuracy: None,
            time_spent_seconds: 0,
        };
        state.attempt = Some(attempt.clone());
        Ok(attempt)
    }

    async fn load_attempt(
        &self,
        attempt_id: &str,
    ) -> Result<(Attempt, Vec<Answer>), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("load:{attempt_id}"));

        let attempt = state
            .attempt
            .clone()
            .filter(|attempt| attempt.id == attempt_id)
            .ok_or_else(|| BackendError::NotFound(format!("attempt {attempt_id}")))?;
        Ok((attempt, state.answers.values().cloned().collect()))
    }

    async fn save_answer(&self, request: SaveAnswerRequest) -> Result<Answer, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("save:{}", request.question_id));

        if state.fail_next_saves > 0 {
            state.fail_next_saves -= 1;
            return Err(Self::network_error("save"));
        }
        if state
            .attempt
            .as_ref()
            .is_some_and(|attempt| attempt.status != AttemptStatus::InProgress)
        {
            return Err(BackendError::InvalidState("attempt is not in progress".to_string()));
        }

        // Upsert on (attempt_id, question_id): same row id on re-save.
        let answer = match state.answers.get(&request.question_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.value = request.value;
                updated
            }
            None => {
                state.next_answer_id += 1;
                Answer {
                    id: format!("ans-{}", state.next_answer_id),
                    attempt_id: request.attempt_id,
                    question_id: request.question_id.clone(),
                    value: request.value,
                    time_spent_seconds: 0,
                    marks: None,
                }
            }
        };
        state.answers.insert(request.question_id, answer.clone());
        Ok(answer)
    }

    async fn update_time_spent(
        &self,
        _attempt_id: &str,
        question_id: &str,
        delta_seconds: i64,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("time:{question_id}:{delta_seconds}"));

        if state.fail_next_time_syncs > 0 {
            state.fail_next_time_syncs -= 1;
            return Err(Self::network_error("time sync"));
        }
        if let Some(answer) = state.answers.get_mut(question_id) {
            answer.time_spent_seconds += delta_seconds;
        }
        if let Some(attempt) = state.attempt.as_mut() {
            attempt.time_spent_seconds += delta_seconds;
        }
        Ok(())
    }

    async fn submit_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("submit".to_string());

        if state.fail_next_submits > 0 {
            state.fail_next_submits -= 1;
            return Err(Self::network_error("submit"));
        }

        let now = now_utc();
        let attempt = state
            .attempt
            .as_mut()
            .filter(|attempt| attempt.id == attempt_id)
            .ok_or_else(|| BackendError::NotFound(format!("attempt {attempt_id}")))?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(BackendError::InvalidState("attempt already submitted".to_string()));
        }
        attempt.status = AttemptStatus::Submitted;
        attempt.submitted_at = Some(now);
        Ok(attempt.clone())
    }

    async fn evaluate_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("evaluate".to_string());

        let attempt = state
            .attempt
            .as_mut()
            .filter(|attempt| attempt.id == attempt_id)
            .ok_or_else(|| BackendError::NotFound(format!("attempt {attempt_id}")))?;
        if attempt.status != AttemptStatus::Submitted {
            return Err(BackendError::InvalidState(
                "only submitted attempts can be evaluated".to_string(),
            ));
        }
        Ok(attempt.clone())
    }
}

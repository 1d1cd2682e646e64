pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{Answer, AnswerValue, Attempt};
use crate::domain::types::AccessType;

pub use http::HttpBackend;

/// Failure modes of the remote collaborator, independent of transport.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("operation not allowed in the attempt's current state: {0}")]
    InvalidState(String),
    #[error("invalid payload: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("an attempt is already in progress for this exam")]
    Conflict,
    /// Transient transport failure; autosave and time-sync retry on the next
    /// cycle, submit/evaluate surface it to the caller.
    #[error("network error: {0}")]
    Network(#[source] anyhow::Error),
    #[error("unexpected backend response: {0}")]
    Unexpected(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Network(_))
    }
}

/// Upsert payload for a single answer. `existing_answer_id` is set when the
/// client already knows the stored row; the backend must update in place
/// either way, never duplicate (attempt_id, question_id).
#[derive(Debug, Clone)]
pub struct SaveAnswerRequest {
    pub attempt_id: String,
    pub question_id: String,
    pub value: AnswerValue,
    pub existing_answer_id: Option<String>,
}

/// Narrow interface to the REST backend. Everything the attempt core needs,
/// nothing else; file uploads, payments and notifications live elsewhere.
#[async_trait]
pub trait AttemptBackend: Send + Sync {
    async fn start_attempt(
        &self,
        exam_id: &str,
        access: AccessType,
        enrollment_ref: Option<&str>,
    ) -> Result<Attempt, BackendError>;

    async fn load_attempt(&self, attempt_id: &str)
        -> Result<(Attempt, Vec<Answer>), BackendError>;

    async fn save_answer(&self, request: SaveAnswerRequest) -> Result<Answer, BackendError>;

    /// Records a *delta* of seconds spent on one question; the client resets
    /// its local accumulator only after this acks.
    async fn update_time_spent(
        &self,
        attempt_id: &str,
        question_id: &str,
        delta_seconds: i64,
    ) -> Result<(), BackendError>;

    async fn submit_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError>;

    async fn evaluate_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError>;
}

use thiserror::Error;

use crate::backend::BackendError;
use crate::domain::types::AttemptStatus;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The operation is illegal from the attempt's current status. Nothing is
    /// mutated when this is returned.
    #[error("{operation} is not allowed while the attempt is {from}")]
    InvalidStateTransition { from: AttemptStatus, operation: &'static str },
    #[error("invalid answer: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("an attempt is already in progress for this exam")]
    DuplicateAttempt,
    #[error("the submission window has closed")]
    DeadlinePassed,
    #[error("network error: {0}")]
    Network(#[source] anyhow::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::AccessDenied(detail) => EngineError::AccessDenied(detail),
            BackendError::InvalidState(detail) => EngineError::Backend(detail),
            BackendError::Validation(detail) => EngineError::Validation(detail),
            BackendError::NotFound(detail) => EngineError::NotFound(detail),
            BackendError::Conflict => EngineError::DuplicateAttempt,
            BackendError::Network(source) => EngineError::Network(source),
            BackendError::Unexpected(detail) => EngineError::Backend(detail),
        }
    }
}

pub mod backend;
pub mod core;
pub mod domain;
pub mod engine;
pub mod schemas;
pub mod services;
pub mod session;
pub mod tasks;

#[cfg(test)]
mod test_support;

pub use crate::backend::{AttemptBackend, BackendError, SaveAnswerRequest};
pub use crate::core::config::Settings;
pub use crate::domain::models::{Answer, AnswerValue, Attempt, Exam, Question, QuestionBody};
pub use crate::domain::types::{AccessType, AttemptStatus, SaveState};
pub use crate::engine::{AnswerView, AttemptEngine, AttemptSnapshot, EngineError};
pub use crate::session::navigation::{Navigator, Progress};
pub use crate::session::review::{classify, review_items, ReviewItem, ReviewOutcome};
pub use crate::tasks::runner::AttemptRunner;

/// Initialize tracing and metrics from settings. Call once, before the first
/// engine is created; embedders that install their own subscriber can skip it.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    core::telemetry::init_tracing(settings)?;
    core::metrics::init(settings)?;
    Ok(())
}

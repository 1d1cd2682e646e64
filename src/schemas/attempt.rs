use serde::{Deserialize, Serialize};

use crate::domain::models::{Answer, AnswerValue, Attempt};
use crate::domain::types::AccessType;

#[derive(Debug, Serialize)]
pub struct StartAttemptBody<'a> {
    pub exam_id: &'a str,
    pub access_type: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct SaveAnswerBody<'a> {
    #[serde(flatten)]
    pub value: &'a AnswerValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_answer_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct TimeSpentBody<'a> {
    pub question_id: &'a str,
    pub delta_seconds: i64,
}

/// Attempt load response: the attempt plus every stored answer.
#[derive(Debug, Deserialize)]
pub struct AttemptEnvelope {
    pub attempt: Attempt,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

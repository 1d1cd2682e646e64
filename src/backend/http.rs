use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{AttemptBackend, BackendError, SaveAnswerRequest};
use crate::core::config::Settings;
use crate::domain::models::{Answer, Attempt};
use crate::domain::types::AccessType;
use crate::schemas::attempt::{AttemptEnvelope, SaveAnswerBody, StartAttemptBody, TimeSpentBody};

/// REST implementation of [`AttemptBackend`]. Each request carries a bearer
/// token and a fresh `x-request-id`; loads retry transient failures with
/// exponential backoff, writes never retry here (the autosave cycle owns
/// write retries).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: String,
    max_load_retries: u32,
}

impl HttpBackend {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = settings.backend();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(backend.connect_timeout_seconds))
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            api_token: backend.api_token.clone(),
            max_load_retries: backend.max_load_retries,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_token)
            .header("x-request-id", Uuid::new_v4().to_string())
    }

    async fn send_expecting_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        conflict: ConflictMeaning,
    ) -> Result<T, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|err| BackendError::Network(anyhow::anyhow!(err).context("request failed")))?;

        let status = response.status();
        let raw_body = response.text().await.map_err(|err| {
            BackendError::Network(anyhow::anyhow!(err).context("failed to read response body"))
        })?;

        if !status.is_success() {
            return Err(map_error(status, &raw_body, conflict));
        }

        serde_json::from_str(&raw_body).map_err(|err| {
            BackendError::Unexpected(format!("malformed body (status {status}): {err}"))
        })
    }

    async fn send_expecting_ack(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|err| BackendError::Network(anyhow::anyhow!(err).context("request failed")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let raw_body = response.text().await.unwrap_or_default();
        Err(map_error(status, &raw_body, ConflictMeaning::InvalidState))
    }
}

#[derive(Debug, Clone, Copy)]
enum ConflictMeaning {
    /// 409 on start means another attempt is already in progress.
    DuplicateAttempt,
    /// 409 elsewhere means the operation hit the wrong attempt status.
    InvalidState,
}

fn map_error(status: StatusCode, raw_body: &str, conflict: ConflictMeaning) -> BackendError {
    let detail = extract_detail(raw_body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::AccessDenied(detail),
        StatusCode::NOT_FOUND => BackendError::NotFound(detail),
        StatusCode::CONFLICT => match conflict {
            ConflictMeaning::DuplicateAttempt => BackendError::Conflict,
            ConflictMeaning::InvalidState => BackendError::InvalidState(detail),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Validation(detail)
        }
        status if status.is_server_error() => {
            BackendError::Network(anyhow::anyhow!("server error {status}: {detail}"))
        }
        status => BackendError::Unexpected(format!("status {status}: {detail}")),
    }
}

fn extract_detail(raw_body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(raw_body) else {
        return raw_body.chars().take(200).collect();
    };

    parsed
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| parsed.get("message").and_then(Value::as_str))
        .or_else(|| parsed.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[async_trait]
impl AttemptBackend for HttpBackend {
    async fn start_attempt(
        &self,
        exam_id: &str,
        access: AccessType,
        enrollment_ref: Option<&str>,
    ) -> Result<Attempt, BackendError> {
        let body = StartAttemptBody { exam_id, access_type: access, enrollment_ref };
        self.send_expecting_json(
            self.request(Method::POST, "/attempts").json(&body),
            ConflictMeaning::DuplicateAttempt,
        )
        .await
    }

    async fn load_attempt(
        &self,
        attempt_id: &str,
    ) -> Result<(Attempt, Vec<Answer>), BackendError> {
        let mut last_error = None;

        for retry in 0..=self.max_load_retries {
            let builder = self.request(Method::GET, &format!("/attempts/{attempt_id}"));
            match self
                .send_expecting_json::<AttemptEnvelope>(builder, ConflictMeaning::InvalidState)
                .await
            {
                Ok(envelope) => return Ok((envelope.attempt, envelope.answers)),
                Err(err) if err.is_retryable() && retry < self.max_load_retries => {
                    tracing::warn!(attempt_id, retry, error = %err, "Retrying attempt load");
                    tokio::time::sleep(Duration::from_secs(2_u64.pow(retry))).await;
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| BackendError::Unexpected("load retries exhausted".to_string())))
    }

    async fn save_answer(&self, request: SaveAnswerRequest) -> Result<Answer, BackendError> {
        let body = SaveAnswerBody {
            value: &request.value,
            existing_answer_id: request.existing_answer_id.as_deref(),
        };
        let path =
            format!("/attempts/{}/answers/{}", request.attempt_id, request.question_id);
        self.send_expecting_json(
            self.request(Method::PUT, &path).json(&body),
            ConflictMeaning::InvalidState,
        )
        .await
    }

    async fn update_time_spent(
        &self,
        attempt_id: &str,
        question_id: &str,
        delta_seconds: i64,
    ) -> Result<(), BackendError> {
        let body = TimeSpentBody { question_id, delta_seconds };
        let path = format!("/attempts/{attempt_id}/time-spent");
        self.send_expecting_ack(self.request(Method::POST, &path).json(&body)).await
    }

    async fn submit_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError> {
        let path = format!("/attempts/{attempt_id}/submit");
        self.send_expecting_json(self.request(Method::POST, &path), ConflictMeaning::InvalidState)
            .await
    }

    async fn evaluate_attempt(&self, attempt_id: &str) -> Result<Attempt, BackendError> {
        let path = format!("/attempts/{attempt_id}/evaluate");
        self.send_expecting_json(self.request(Method::POST, &path), ConflictMeaning::InvalidState)
            .await
    }
}

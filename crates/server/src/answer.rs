//! Client for the external answer-generation service.
//!
//! The service takes `{role, question, chat_history?, system_prompt?,
//! data_context?}` and replies `{answer}`. Transport failures that mean the
//! service is not there at all are reported separately from everything else.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::Role;
use thiserror::Error;

use crate::config::AnswerServiceConfig;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerRequest {
    pub role: Role,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_context: Option<String>,
}

impl AnswerRequest {
    pub fn student(question: impl Into<String>, chat_history: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            question: question.into(),
            chat_history: Some(chat_history.into()),
            system_prompt: None,
            data_context: None,
        }
    }

    pub fn mentor(
        question: impl Into<String>,
        system_prompt: impl Into<String>,
        data_context: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Mentor,
            question: question.into(),
            chat_history: None,
            system_prompt: Some(system_prompt.into()),
            data_context: Some(data_context.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnswerBody {
    answer: String,
}

#[derive(Error, Debug)]
pub enum AnswerError {
    /// Refused, unreachable, or timed out
    #[error("answer service unavailable: {0}")]
    Unavailable(String),

    #[error("answer service failed: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, request: &AnswerRequest) -> Result<String, AnswerError>;
}

pub struct HttpAnswerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnswerClient {
    pub fn new(config: &AnswerServiceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }
}

#[async_trait]
impl AnswerService for HttpAnswerClient {
    async fn ask(&self, request: &AnswerRequest) -> Result<String, AnswerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnswerError::Upstream(format!("status {}", status)));
        }

        let body: AnswerBody = response
            .json()
            .await
            .map_err(|e| AnswerError::Upstream(format!("invalid response body: {}", e)))?;
        Ok(body.answer)
    }
}

fn map_transport_error(err: reqwest::Error) -> AnswerError {
    if err.is_connect() || err.is_timeout() {
        AnswerError::Unavailable(err.to_string())
    } else {
        AnswerError::Upstream(err.to_string())
    }
}

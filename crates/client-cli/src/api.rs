//! HTTP client for the Scholar Hub REST API.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    AnswerResponse, AskRequest, ErrorResponse, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, RosterResponse, StudentSummary, UserInfo, UserResponse,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{reason} ({status})")]
    Server { status: StatusCode, reason: String },

    #[error("Not logged in. Run 'scholar login' first")]
    NotLoggedIn,

    #[error("Could not reach server: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotLoggedIn)?;
        Ok(builder.bearer_auth(token))
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<UserInfo, ApiError> {
        let resp: UserResponse =
            send(self.http.post(self.endpoint("/register")).json(req)).await?;
        Ok(resp.user)
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        send(self.http.post(self.endpoint("/login")).json(req)).await
    }

    pub async fn logout(&self) -> Result<MessageResponse, ApiError> {
        send(self.authorized(self.http.post(self.endpoint("/logout")))?).await
    }

    pub async fn me(&self) -> Result<UserInfo, ApiError> {
        let resp: UserResponse = send(self.authorized(self.http.get(self.endpoint("/me")))?).await?;
        Ok(resp.user)
    }

    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        let body = AskRequest {
            question: question.to_string(),
        };
        let resp: AnswerResponse =
            send(self.authorized(self.http.post(self.endpoint("/bot/ask")))?.json(&body)).await?;
        Ok(resp.answer)
    }

    pub async fn students(&self) -> Result<Vec<StudentSummary>, ApiError> {
        let resp: RosterResponse =
            send(self.authorized(self.http.get(self.endpoint("/mentor/students")))?).await?;
        Ok(resp.students)
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let resp = builder.send().await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!("Server returned {}: {}", status, body);
        return Err(server_error(status, &body));
    }

    Ok(resp.json().await?)
}

/// Build an error from a failed response, preferring the server's own words.
fn server_error(status: StatusCode, body: &str) -> ApiError {
    let reason = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.reason().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    ApiError::Server { status, reason }
}

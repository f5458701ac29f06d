use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::ErrorResponse;
use thiserror::Error;

use crate::{answer::AnswerError, chat::ChatError};

pub const UNAVAILABLE_ANSWER: &str =
    "Sorry, the AI assistant is currently unavailable. Please try again later.";
pub const INTERNAL_ANSWER: &str = "An unexpected error occurred. Please contact support.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    AuthError(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `Json` whose decode failures come back as an `AppError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        match rejection {
            JsonRejection::JsonDataError(_) => AppError::Validation(
                "Request body has missing fields or fields of the wrong type".to_string(),
            ),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Expected a JSON request body".to_string())
            }
            _ => AppError::BadRequest("Request body is not valid JSON".to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::Forbidden(msg) => AppError::Forbidden(msg),
            ChatError::Answer(AnswerError::Unavailable(detail)) => {
                tracing::error!("Answer service unavailable: {}", detail);
                AppError::ServiceUnavailable(UNAVAILABLE_ANSWER.to_string())
            }
            ChatError::Answer(e @ AnswerError::Upstream(_)) => AppError::Internal(e.to_string()),
            ChatError::Internal(e) => AppError::from(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            // Details stay in the log
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                INTERNAL_ANSWER.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::message(message))).into_response()
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use shared::{AnswerResponse, AskRequest, ErrorResponse};

use crate::{
    answer::AnswerError,
    chat::ChatError,
    error::{AppError, AppJson, INTERNAL_ANSWER, UNAVAILABLE_ANSWER},
    identity::Caller,
    state::AppState,
};

/// POST /bot/ask
///
/// Answer-service and storage failures come back as a canned `answer`
/// rather than an error message; the cause is only logged.
pub async fn ask(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(req): AppJson<AskRequest>,
) -> Result<Json<AnswerResponse>, Response> {
    match state.chat.ask(&caller.user, &req.question).await {
        Ok(answer) => Ok(Json(AnswerResponse { answer })),
        Err(ChatError::Answer(AnswerError::Unavailable(detail))) => {
            tracing::error!(
                "Answer service connection failed ({} {}): {}",
                caller.user.role,
                caller.user.id,
                detail
            );
            Err(fallback(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_ANSWER))
        }
        Err(ChatError::Answer(e)) => {
            tracing::error!("Answer service error for user {}: {}", caller.user.id, e);
            Err(fallback(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ANSWER))
        }
        Err(ChatError::Internal(e)) => {
            tracing::error!("Unexpected error answering user {}: {:#}", caller.user.id, e);
            Err(fallback(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ANSWER))
        }
        Err(e) => Err(AppError::from(e).into_response()),
    }
}

fn fallback(status: StatusCode, answer: &str) -> Response {
    (status, Json(ErrorResponse::answer(answer))).into_response()
}

use axum::{extract::State, http::StatusCode, Extension, Json};
use shared::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, UserResponse};

use crate::{
    error::{AppError, AppJson},
    identity::Caller,
    state::AppState,
};

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.identity.register(req).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user: user.info() })))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (user, token) = state.identity.login(req).await?;
    Ok(Json(LoginResponse {
        user: user.info(),
        token,
    }))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<MessageResponse>, AppError> {
    state.identity.logout(&caller).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// GET /me
pub async fn me(Extension(caller): Extension<Caller>) -> Json<UserResponse> {
    Json(UserResponse {
        user: caller.user.info(),
    })
}

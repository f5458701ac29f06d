//! Request guards. `require_auth` must wrap `require_role`-style guards so an
//! unauthenticated request is rejected before any role logic runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::Role;

use crate::{
    error::AppError,
    identity::{require_role, Caller},
    state::AppState,
};

/// Resolve the bearer token and stash the [`Caller`] in request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::AuthError("Missing or invalid Authorization header".to_string())
    })?;

    let caller = state.identity.authenticate(bearer.token()).await?;
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

pub async fn require_mentor(
    Extension(caller): Extension<Caller>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&caller.user, Role::Mentor)?;
    Ok(next.run(request).await)
}

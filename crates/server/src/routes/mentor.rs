use axum::{extract::State, Extension, Json};
use shared::RosterResponse;

use crate::{error::AppError, identity::Caller, state::AppState};

/// GET /mentor/students
/// Students sharing the calling mentor's school.
pub async fn students(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<RosterResponse>, AppError> {
    let cohort = state.chat.cohort(&caller.user).await?;
    tracing::debug!(
        "Mentor profile {} listed {} students",
        cohort.mentor.id,
        cohort.students.len()
    );

    Ok(Json(RosterResponse {
        students: cohort.students.iter().map(|s| s.summary()).collect(),
    }))
}

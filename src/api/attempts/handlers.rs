use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_member, CurrentUser};
use crate::api::validation::optional_json;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::schemas::attempt::{
    into_inputs, AttemptDraft, AttemptResponse, AttemptStart, AttemptSubmit,
};
use crate::services::{attempts, quizzes};

/// Every attempt route needs the caller enrolled in the quiz's course.
async fn require_quiz_member(
    state: &AppState,
    user: &User,
    quiz_id: &str,
) -> Result<(), ApiError> {
    let quiz = quizzes::get_quiz(state, quiz_id).await?;
    require_course_member(state, user, &quiz.course_id).await?;
    Ok(())
}

pub(super) async fn start_attempt(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    require_quiz_member(&state, &user, &quiz_id).await?;
    let payload: AttemptStart = optional_json(&body)?;

    let now = OffsetDateTime::now_utc();
    let started =
        attempts::start_attempt(&state, &quiz_id, &user, payload.access_code.as_deref(), now)
            .await?;

    let status = if started.resumed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(AttemptResponse::from_db(&started.attempt, now))))
}

/// Faculty see the whole gradebook; everyone else sees their own attempts.
pub(super) async fn list_attempts(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    require_quiz_member(&state, &user, &quiz_id).await?;

    let now = OffsetDateTime::now_utc();
    let owner = if user.role.is_faculty() { None } else { Some(user.id.as_str()) };
    let list = attempts::list_attempts(&state, &quiz_id, owner, now).await?;
    Ok(Json(list.iter().map(|attempt| AttemptResponse::from_db(attempt, now)).collect()))
}

pub(super) async fn latest_attempt(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Option<AttemptResponse>>, ApiError> {
    require_quiz_member(&state, &user, &quiz_id).await?;

    let now = OffsetDateTime::now_utc();
    let latest = attempts::latest_attempt(&state, &quiz_id, &user, now).await?;
    Ok(Json(latest.map(|attempt| AttemptResponse::from_db(&attempt, now))))
}

pub(super) async fn save_draft(
    Path((quiz_id, attempt_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptDraft>,
) -> Result<Json<AttemptResponse>, ApiError> {
    require_quiz_member(&state, &user, &quiz_id).await?;

    let now = OffsetDateTime::now_utc();
    let attempt = attempts::save_draft(
        &state,
        &quiz_id,
        &attempt_id,
        &user,
        into_inputs(payload.answers),
        now,
    )
    .await?;
    Ok(Json(AttemptResponse::from_db(&attempt, now)))
}

pub(super) async fn submit_attempt(
    Path((quiz_id, attempt_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AttemptResponse>, ApiError> {
    require_quiz_member(&state, &user, &quiz_id).await?;
    let payload: AttemptSubmit = optional_json(&body)?;

    let now = OffsetDateTime::now_utc();
    let attempt = attempts::submit_attempt(
        &state,
        &quiz_id,
        &attempt_id,
        &user,
        payload.answers.map(into_inputs),
        now,
    )
    .await?;

    tracing::info!(
        quiz_id = %quiz_id,
        attempt_id = %attempt.id,
        user_id = %user.id,
        score = attempt.score.unwrap_or_default(),
        "Quiz attempt submitted"
    );
    Ok(Json(AttemptResponse::from_db(&attempt, now)))
}

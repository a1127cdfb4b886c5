use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_faculty, require_course_member, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::models::{Quiz, User};
use crate::schemas::quiz::{QuestionPayload, QuizCreate, QuizResponse, QuizUpdate, QuizView};
use crate::services::{attempts, quizzes};

/// Loads a quiz the caller may read. Unpublished quizzes do not exist for
/// students.
async fn readable_quiz(state: &AppState, user: &User, quiz_id: &str) -> Result<Quiz, ApiError> {
    let quiz = quizzes::get_quiz(state, quiz_id).await?;
    require_course_member(state, user, &quiz.course_id).await?;
    if !quiz.published && !user.role.is_faculty() {
        return Err(ApiError::NotFound(format!("quiz {quiz_id} not found")));
    }
    Ok(quiz)
}

async fn editable_quiz(state: &AppState, user: &User, quiz_id: &str) -> Result<Quiz, ApiError> {
    let quiz = quizzes::get_quiz(state, quiz_id).await?;
    require_course_faculty(state, user, &quiz.course_id).await?;
    Ok(quiz)
}

async fn view_for(state: &AppState, user: &User, quiz: &Quiz) -> Result<QuizView, ApiError> {
    if user.role.is_faculty() {
        return Ok(QuizView::Full);
    }
    if quiz.show_correct_answers
        && attempts::has_completed_attempt(state, &quiz.id, &user.id).await?
    {
        return Ok(QuizView::StudentWithAnswers);
    }
    Ok(QuizView::Student)
}

pub(super) async fn list_quizzes(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    require_course_member(&state, &user, &course_id).await?;

    let faculty = user.role.is_faculty();
    let view = if faculty { QuizView::Full } else { QuizView::Student };
    let quizzes = quizzes::list_quizzes(&state, &course_id, faculty).await?;
    Ok(Json(quizzes.iter().map(|quiz| QuizResponse::from_db(quiz, view)).collect()))
}

pub(super) async fn create_quiz(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    require_course_faculty(&state, &user, &course_id).await?;
    validate_payload(&payload)?;

    let quiz =
        quizzes::create_quiz(&state, &course_id, payload, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(&quiz, QuizView::Full))))
}

pub(super) async fn get_quiz(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = readable_quiz(&state, &user, &quiz_id).await?;
    let view = view_for(&state, &user, &quiz).await?;
    Ok(Json(QuizResponse::from_db(&quiz, view)))
}

pub(super) async fn update_quiz(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    editable_quiz(&state, &user, &quiz_id).await?;
    validate_payload(&payload)?;

    let quiz = quizzes::update_quiz(&state, &quiz_id, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(QuizResponse::from_db(&quiz, QuizView::Full)))
}

pub(super) async fn delete_quiz(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    editable_quiz(&state, &user, &quiz_id).await?;
    quizzes::delete_quiz(&state, &quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn add_question(
    Path(quiz_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    editable_quiz(&state, &user, &quiz_id).await?;

    let quiz =
        quizzes::add_question(&state, &quiz_id, payload, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(&quiz, QuizView::Full))))
}

pub(super) async fn update_question(
    Path((quiz_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<QuizResponse>, ApiError> {
    editable_quiz(&state, &user, &quiz_id).await?;

    let quiz = quizzes::update_question(
        &state,
        &quiz_id,
        &question_id,
        payload,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(QuizResponse::from_db(&quiz, QuizView::Full)))
}

pub(super) async fn delete_question(
    Path((quiz_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    editable_quiz(&state, &user, &quiz_id).await?;

    let quiz =
        quizzes::delete_question(&state, &quiz_id, &question_id, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(QuizResponse::from_db(&quiz, QuizView::Full)))
}

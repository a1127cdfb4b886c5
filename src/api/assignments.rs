use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_faculty, require_course_member, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::models::Assignment;
use crate::schemas::assignment::{
    AssignmentCreate, AssignmentResponse, AssignmentUpdate, DEFAULT_ASSIGNMENT_POINTS,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/:course_id/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route(
            "/assignments/:assignment_id",
            get(get_assignment).put(update_assignment).delete(delete_assignment),
        )
}

fn check_assignment(assignment: &Assignment) -> Result<(), ApiError> {
    if !assignment.points.is_finite() || assignment.points < 0.0 {
        return Err(ApiError::BadRequest("points must be a non-negative number".to_string()));
    }
    if let (Some(available), Some(until)) = (assignment.available_date, assignment.until_date) {
        if until < available {
            return Err(ApiError::BadRequest(
                "untilDate must not be before availableDate".to_string(),
            ));
        }
    }
    Ok(())
}

async fn load_assignment(state: &AppState, assignment_id: &str) -> Result<Assignment, ApiError> {
    state
        .store()
        .find_assignment(assignment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("assignment {assignment_id} not found")))
}

async fn list_assignments(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    require_course_member(&state, &user, &course_id).await?;
    let assignments = state.store().list_assignments(&course_id).await?;
    Ok(Json(assignments.iter().map(AssignmentResponse::from_db).collect()))
}

async fn create_assignment(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    require_course_faculty(&state, &user, &course_id).await?;
    validate_payload(&payload)?;

    let now = OffsetDateTime::now_utc();
    let assignment = Assignment {
        id: Uuid::new_v4().to_string(),
        course_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        points: payload.points.unwrap_or(DEFAULT_ASSIGNMENT_POINTS),
        due_date: payload.due_date,
        available_date: payload.available_date,
        until_date: payload.until_date,
        created_at: now,
        updated_at: now,
    };
    check_assignment(&assignment)?;

    let assignment = state.store().create_assignment(assignment).await?;
    tracing::info!(
        assignment_id = %assignment.id,
        course_id = %assignment.course_id,
        "Assignment created"
    );
    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(&assignment))))
}

async fn get_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = load_assignment(&state, &assignment_id).await?;
    require_course_member(&state, &user, &assignment.course_id).await?;
    Ok(Json(AssignmentResponse::from_db(&assignment)))
}

async fn update_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let mut assignment = load_assignment(&state, &assignment_id).await?;
    require_course_faculty(&state, &user, &assignment.course_id).await?;
    validate_payload(&payload)?;

    if let Some(title) = payload.title {
        assignment.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        assignment.description = description;
    }
    if let Some(points) = payload.points {
        assignment.points = points;
    }
    if let Some(due_date) = payload.due_date {
        assignment.due_date = due_date;
    }
    if let Some(available_date) = payload.available_date {
        assignment.available_date = available_date;
    }
    if let Some(until_date) = payload.until_date {
        assignment.until_date = until_date;
    }
    check_assignment(&assignment)?;
    assignment.updated_at = OffsetDateTime::now_utc();

    state.store().save_assignment(&assignment).await?;
    Ok(Json(AssignmentResponse::from_db(&assignment)))
}

async fn delete_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let assignment = load_assignment(&state, &assignment_id).await?;
    require_course_faculty(&state, &user, &assignment.course_id).await?;

    state.store().delete_assignment(&assignment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

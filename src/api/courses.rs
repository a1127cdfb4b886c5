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
use crate::db::models::{Course, Enrollment};
use crate::schemas::course::{CourseCreate, CourseResponse, CourseUpdate};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:course_id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/:course_id/users", get(list_course_users))
}

async fn list_courses(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = state.store().list_courses().await?;
    Ok(Json(courses.iter().map(CourseResponse::from_db).collect()))
}

/// Faculty create courses and are enrolled in them right away.
async fn create_course(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    if !user.role.is_faculty() {
        return Err(ApiError::Forbidden("Faculty access required"));
    }
    validate_payload(&payload)?;

    let now = OffsetDateTime::now_utc();
    let course = state
        .store()
        .create_course(Course {
            id: Uuid::new_v4().to_string(),
            name: payload.name.map(|name| name.trim().to_string()).unwrap_or_else(|| {
                "New Course".to_string()
            }),
            number: payload.number.unwrap_or_default(),
            department: payload.department,
            credits: payload.credits,
            description: payload.description.unwrap_or_default(),
            start_date: payload.start_date,
            end_date: payload.end_date,
            author: Some(user.id.clone()),
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .store()
        .enroll(Enrollment {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            created_at: now,
        })
        .await?;

    tracing::info!(user_id = %user.id, course_id = %course.id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(&course))))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = require_course_member(&state, &user, &course_id).await?;
    Ok(Json(CourseResponse::from_db(&course)))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    let mut course = require_course_faculty(&state, &user, &course_id).await?;
    validate_payload(&payload)?;

    if let Some(name) = payload.name {
        course.name = name.trim().to_string();
    }
    if let Some(number) = payload.number {
        course.number = number;
    }
    if let Some(department) = payload.department {
        course.department = department;
    }
    if let Some(credits) = payload.credits {
        if credits.is_some_and(|value| value < 0) {
            return Err(ApiError::BadRequest("credits must not be negative".to_string()));
        }
        course.credits = credits;
    }
    if let Some(description) = payload.description {
        course.description = description;
    }
    if let Some(start_date) = payload.start_date {
        course.start_date = start_date;
    }
    if let Some(end_date) = payload.end_date {
        course.end_date = end_date;
    }
    if let (Some(start), Some(end)) = (course.start_date, course.end_date) {
        if end < start {
            return Err(ApiError::BadRequest("endDate must not be before startDate".to_string()));
        }
    }
    course.updated_at = OffsetDateTime::now_utc();

    state.store().save_course(&course).await?;
    Ok(Json(CourseResponse::from_db(&course)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_course_faculty(&state, &user, &course_id).await?;

    if !state.store().delete_course(&course_id).await? {
        return Err(ApiError::NotFound(format!("course {course_id} not found")));
    }

    tracing::info!(
        user_id = %user.id,
        course_id = %course_id,
        "Course deleted with its enrollments, modules, assignments and quizzes"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn list_course_users(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_course_member(&state, &user, &course_id).await?;
    let members = state.store().list_course_members(&course_id).await?;
    Ok(Json(members.iter().map(UserResponse::from_db).collect()))
}

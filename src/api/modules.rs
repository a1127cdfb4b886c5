use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sqlx::types::Json as JsonColumn;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_faculty, require_course_member, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::models::{CourseModule, Lesson};
use crate::schemas::module::{LessonPayload, ModuleCreate, ModuleResponse, ModuleUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/courses/:course_id/modules", get(list_modules).post(create_module))
        .route("/modules/:module_id", put(update_module).delete(delete_module))
}

/// Lessons keep their ids; new ones get a fresh id.
fn into_lessons(payloads: Vec<LessonPayload>) -> Result<Vec<Lesson>, ApiError> {
    payloads
        .into_iter()
        .map(|lesson| {
            let name = lesson.name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::BadRequest("lesson name must not be empty".to_string()));
            }
            Ok(Lesson {
                id: lesson
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                name,
                description: lesson.description,
            })
        })
        .collect()
}

async fn load_module(state: &AppState, module_id: &str) -> Result<CourseModule, ApiError> {
    state
        .store()
        .find_module(module_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("module {module_id} not found")))
}

async fn list_modules(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ModuleResponse>>, ApiError> {
    require_course_member(&state, &user, &course_id).await?;
    let modules = state.store().list_modules(&course_id).await?;
    Ok(Json(modules.iter().map(ModuleResponse::from_db).collect()))
}

async fn create_module(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ModuleCreate>,
) -> Result<(StatusCode, Json<ModuleResponse>), ApiError> {
    require_course_faculty(&state, &user, &course_id).await?;
    validate_payload(&payload)?;

    let now = OffsetDateTime::now_utc();
    let module = state
        .store()
        .create_module(CourseModule {
            id: Uuid::new_v4().to_string(),
            course_id,
            name: payload.name.trim().to_string(),
            description: payload.description,
            lessons: JsonColumn(into_lessons(payload.lessons)?),
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ModuleResponse::from_db(&module))))
}

async fn update_module(
    Path(module_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ModuleUpdate>,
) -> Result<Json<ModuleResponse>, ApiError> {
    let mut module = load_module(&state, &module_id).await?;
    require_course_faculty(&state, &user, &module.course_id).await?;
    validate_payload(&payload)?;

    if let Some(name) = payload.name {
        module.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        module.description = description;
    }
    if let Some(lessons) = payload.lessons {
        module.lessons = JsonColumn(into_lessons(lessons)?);
    }
    module.updated_at = OffsetDateTime::now_utc();

    state.store().save_module(&module).await?;
    Ok(Json(ModuleResponse::from_db(&module)))
}

async fn delete_module(
    Path(module_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let module = load_module(&state, &module_id).await?;
    require_course_faculty(&state, &user, &module.course_id).await?;

    state.store().delete_module(&module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn faculty_build_modules_and_students_read_them() {
        let ctx = test_support::setup_test_context().await;
        let (course, faculty, student) = test_support::course_with_members(&ctx.state).await;
        let faculty_token = test_support::session_token(&ctx.state, &faculty).await;
        let student_token = test_support::session_token(&ctx.state, &student).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/modules", course.id),
                Some(&faculty_token),
                Some(json!({
                    "name": "Week 1",
                    "lessons": [
                        {"_id": "L101", "name": "Intro"},
                        {"name": "Tooling", "description": "editors and shells"}
                    ]
                })),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
        let module = test_support::read_json(response).await;
        assert_eq!(module["course"], course.id.as_str());
        assert_eq!(module["lessons"][0]["_id"], "L101");
        assert!(module["lessons"][1]["_id"].as_str().is_some_and(|id| !id.is_empty()));
        let module_id = module["_id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/modules", course.id),
                Some(&student_token),
                Some(json!({"name": "Student module"})),
            ))
            .await
            .expect("student create");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/modules/{module_id}"),
                Some(&faculty_token),
                Some(json!({"name": "Week 1: Foundations"})),
            ))
            .await
            .expect("update");
        assert_eq!(response.status(), StatusCode::OK);
        let updated = test_support::read_json(response).await;
        assert_eq!(updated["name"], "Week 1: Foundations");
        assert_eq!(updated["lessons"].as_array().expect("lessons").len(), 2);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/courses/{}/modules", course.id),
                Some(&student_token),
                None,
            ))
            .await
            .expect("list");
        assert_eq!(response.status(), StatusCode::OK);
        let modules = test_support::read_json(response).await;
        assert_eq!(modules.as_array().expect("array").len(), 1);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("/api/modules/{module_id}"),
                Some(&faculty_token),
                None,
            ))
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/modules/{module_id}"),
                Some(&faculty_token),
                Some(json!({"name": "Gone"})),
            ))
            .await
            .expect("update deleted");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_module_names_are_rejected() {
        let ctx = test_support::setup_test_context().await;
        let (course, faculty, _student) = test_support::course_with_members(&ctx.state).await;
        let token = test_support::session_token(&ctx.state, &faculty).await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/modules", course.id),
                Some(&token),
                Some(json!({"name": ""})),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert_eq!(body["kind"], "validation_error");
    }
}

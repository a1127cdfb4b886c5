use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, security, state::AppState};
use crate::db::models::{Course, Enrollment, Quiz, Session, User};
use crate::db::types::UserRole;
use crate::repositories::memory::MemoryStore;
use crate::schemas::quiz::QuizCreate;
use crate::services::quizzes;

const TEST_SECRET_KEY: &str = "test-secret";
pub(crate) const TEST_PASSWORD: &str = "password123";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("KAMBAZ_ENV", "test");
    std::env::set_var("KAMBAZ_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("KAMBAZ_STORE", "memory");
    std::env::set_var("KAMBAZ_SEED_PATH", "none");
    std::env::set_var("API_PREFIX", "/api");
    std::env::set_var("PASSWORD_HASH_MEMORY_KIB", "64");
    std::env::set_var("QUIZ_SUBMIT_GRACE_SECONDS", "60");
    std::env::set_var("SESSION_COOKIE_NAME", "kambaz_session");
    std::env::set_var("SESSION_COOKIE_SECURE", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "6379");
    std::env::remove_var("FIRST_SUPERUSER_USERNAME");
    std::env::remove_var("FIRST_SUPERUSER_PASSWORD");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
}

/// Fresh in-memory state built from whatever the environment holds now.
/// Redis is never connected, so rate limiting degrades open.
pub(crate) fn state_with_current_env() -> AppState {
    let settings = Settings::load().expect("settings");
    let redis = RedisHandle::new(settings.redis().redis_url());
    AppState::new(settings, Arc::new(MemoryStore::new()), redis)
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let state = state_with_current_env();
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) async fn insert_user(
    state: &AppState,
    username: &str,
    role: UserRole,
    password: &str,
) -> User {
    let hashed_password = security::hash_password(password, 64).expect("hash password");
    let now = OffsetDateTime::now_utc();

    state
        .store()
        .create_user(User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            hashed_password,
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            email: Some(format!("{username}@example.edu")),
            section: None,
            role,
            last_activity: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert user")
}

pub(crate) async fn insert_course(state: &AppState, number: &str, name: &str) -> Course {
    let now = OffsetDateTime::now_utc();
    state
        .store()
        .create_course(Course {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            number: number.to_string(),
            department: Some("CS".to_string()),
            credits: Some(4),
            description: String::new(),
            start_date: None,
            end_date: None,
            author: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert course")
}

pub(crate) async fn enroll(state: &AppState, user: &User, course: &Course) {
    state
        .store()
        .enroll(Enrollment {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .expect("enroll");
}

/// Creates a course with an enrolled faculty member and student.
pub(crate) async fn course_with_members(state: &AppState) -> (Course, User, User) {
    let course = insert_course(state, "CS4550", "Web Development").await;
    let faculty = insert_user(state, "faculty", UserRole::Faculty, TEST_PASSWORD).await;
    let student = insert_user(state, "student", UserRole::Student, TEST_PASSWORD).await;
    enroll(state, &faculty, &course).await;
    enroll(state, &student, &course).await;
    (course, faculty, student)
}

pub(crate) async fn session_token(state: &AppState, user: &User) -> String {
    let now = OffsetDateTime::now_utc();
    let session = state
        .store()
        .create_session(Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        })
        .await
        .expect("session");
    security::create_session_token(&user.id, &session.id, session.expires_at, state.settings())
        .expect("token")
}

/// Published quiz with one question of each type worth 5, 10, and 4 points.
pub(crate) async fn published_quiz(state: &AppState, course: &Course, extra: serde_json::Value) -> Quiz {
    let mut body = json!({
        "title": "Checkpoint",
        "published": true,
        "questions": [
            {"title": "TF", "type": "TRUE_FALSE", "points": 5, "question": "Rust is memory safe",
             "correctAnswers": ["True"]},
            {"title": "Capital", "type": "FILL_IN_BLANK", "points": 10, "question": "Capital of France",
             "correctAnswers": ["Paris", "paris"]},
            {"title": "Letters", "type": "MULTIPLE_CHOICE", "points": 4, "question": "Pick",
             "choices": ["A", "B", "C"], "correctAnswers": ["A", "C"]}
        ]
    });
    if let (Some(target), Some(overrides)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in overrides {
            target.insert(key.clone(), value.clone());
        }
    }
    let payload: QuizCreate = serde_json::from_value(body).expect("quiz payload");
    quizzes::create_quiz(state, &course.id, payload, OffsetDateTime::now_utc())
        .await
        .expect("create quiz")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) fn cookie_request(method: Method, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentSession, CurrentUser};
use crate::api::validation::{validate_password_len, validate_payload, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::{Enrollment, Session, User};
use crate::db::types::UserRole;
use crate::repositories::UserFilter;
use crate::schemas::course::CourseResponse;
use crate::schemas::user::{
    AdminUserCreate, UserListQuery, UserResponse, UserSignin, UserSignup, UserUpdate,
};

/// Max sign-in attempts per username per window.
const SIGNIN_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const SIGNIN_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/profile", get(profile).post(profile))
        .route("/current/courses", get(current_courses))
        .route("/current/courses/:course_id", post(enroll_current).delete(unenroll_current))
        .route("/:user_id", get(get_user).put(update_user).delete(delete_user))
}

struct NewUser {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    section: Option<String>,
    role: UserRole,
}

async fn insert_user(state: &AppState, new_user: NewUser) -> Result<User, ApiError> {
    validate_username(&new_user.username)?;
    validate_password_len(&new_user.password)?;

    let existing = state
        .store()
        .find_user_by_username(&new_user.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let hashed_password = security::hash_password(
        &new_user.password,
        state.settings().security().password_hash_memory_kib,
    )
    .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = OffsetDateTime::now_utc();
    let user = state
        .store()
        .create_user(User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            hashed_password,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            section: new_user.section,
            role: new_user.role,
            last_activity: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok(user)
}

/// Opens a server-side session and returns the cookie that references it.
async fn start_session(state: &AppState, user: &User) -> Result<Cookie<'static>, ApiError> {
    let security_settings = state.settings().security();
    let now = OffsetDateTime::now_utc();
    let lifetime = Duration::minutes(
        i64::try_from(security_settings.session_expire_minutes).unwrap_or(i64::MAX / 60),
    );

    let session = state
        .store()
        .create_session(Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + lifetime,
        })
        .await?;

    let token =
        security::create_session_token(&user.id, &session.id, session.expires_at, state.settings())
            .map_err(|e| ApiError::internal(e, "Failed to create session token"))?;

    Ok(Cookie::build((security_settings.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(security_settings.cookie_secure)
        .max_age(lifetime)
        .build())
}

async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UserSignup>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>), ApiError> {
    validate_payload(&payload)?;

    let user = insert_user(
        &state,
        NewUser {
            username: payload.username.trim().to_string(),
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            section: payload.section,
            role: UserRole::Student,
        },
    )
    .await?;
    let cookie = start_session(&state, &user).await?;

    tracing::info!(user_id = %user.id, action = "signup", "User signed up");
    Ok((StatusCode::CREATED, jar.add(cookie), Json(UserResponse::from_db(&user))))
}

async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UserSignin>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let username = payload.username.trim();
    let rate_key = format!("rl:signin:{username}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, SIGNIN_RATE_LIMIT, SIGNIN_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many sign-in attempts, try again later"));
    }

    let user = state
        .store()
        .find_user_by_username(username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    let mut user = user;
    let now = OffsetDateTime::now_utc();
    user.last_activity = Some(now);
    state.store().save_user(&user).await?;
    if let Err(err) = state.store().delete_expired_sessions(now).await {
        tracing::warn!(error = %err, "Failed to prune expired sessions");
    }

    let cookie = start_session(&state, &user).await?;
    tracing::info!(user_id = %user.id, action = "signin", "User signed in");
    Ok((jar.add(cookie), Json(UserResponse::from_db(&user))))
}

async fn signout(
    State(state): State<AppState>,
    current: CurrentSession,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    state.store().delete_session(&current.session.id).await?;

    let cookie_name = state.settings().security().cookie_name.clone();
    tracing::info!(user_id = %current.user.id, action = "signout", "User signed out");
    Ok((jar.remove(Cookie::build((cookie_name, "")).path("/")), StatusCode::NO_CONTENT))
}

async fn profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(&user))
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let filter = UserFilter { role: params.role, name: params.name };
    let users = state.store().list_users(&filter).await?;
    Ok(Json(users.iter().map(UserResponse::from_db).collect()))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_payload(&payload)?;

    let user = insert_user(
        &state,
        NewUser {
            username: payload.username.trim().to_string(),
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            section: payload.section,
            role: payload.role,
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        action = "user_create",
        "Admin created user"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(&user))))
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    state
        .store()
        .find_user(user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn get_user(
    Path(user_id): Path<String>,
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    if current.id != user_id && current.role != UserRole::Admin {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    let user = load_user(&state, &user_id).await?;
    Ok(Json(UserResponse::from_db(&user)))
}

async fn update_user(
    Path(user_id): Path<String>,
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    let is_admin = current.role == UserRole::Admin;
    if current.id != user_id && !is_admin {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    if payload.role.is_some() && !is_admin {
        return Err(ApiError::Forbidden("Only admins can change roles"));
    }
    validate_payload(&payload)?;

    let mut user = load_user(&state, &user_id).await?;
    if let Some(first_name) = payload.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name {
        user.last_name = last_name;
    }
    if let Some(email) = payload.email {
        user.email = Some(email).filter(|email| !email.trim().is_empty());
    }
    if let Some(section) = payload.section {
        user.section = Some(section).filter(|section| !section.trim().is_empty());
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(password) = payload.password.as_deref() {
        validate_password_len(password)?;
        user.hashed_password =
            security::hash_password(password, state.settings().security().password_hash_memory_kib)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    }
    user.updated_at = OffsetDateTime::now_utc();
    state.store().save_user(&user).await?;

    tracing::info!(
        actor_id = %current.id,
        user_id = %user.id,
        action = "user_update",
        "User updated"
    );
    Ok(Json(UserResponse::from_db(&user)))
}

async fn delete_user(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if admin.id == user_id {
        return Err(ApiError::BadRequest("Admins cannot delete themselves".to_string()));
    }
    if !state.store().delete_user(&user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = %admin.id, user_id = %user_id, action = "user_delete", "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

async fn current_courses(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = state.store().list_courses_for_user(&user.id).await?;
    Ok(Json(courses.iter().map(CourseResponse::from_db).collect()))
}

async fn enroll_current(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    // Enrollment grants authoring rights to faculty, so only learners join on their own.
    if user.role.is_faculty() {
        return Err(ApiError::Forbidden("Faculty are enrolled by an administrator"));
    }
    let course = state
        .store()
        .find_course(&course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("course {course_id} not found")))?;

    state
        .store()
        .enroll(Enrollment {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    tracing::info!(user_id = %user.id, course_id = %course.id, action = "enroll", "User enrolled");
    Ok(Json(CourseResponse::from_db(&course)))
}

async fn unenroll_current(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if !state.store().unenroll(&user.id, &course_id).await? {
        return Err(ApiError::NotFound("Enrollment not found".to_string()));
    }

    tracing::info!(user_id = %user.id, course_id = %course_id, action = "unenroll", "User unenrolled");
    Ok(StatusCode::NO_CONTENT)
}

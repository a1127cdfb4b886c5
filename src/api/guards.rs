use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Course, Session, User};
use crate::db::types::UserRole;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);

/// The signed-in user together with the server-side session backing the
/// cookie, for handlers that end the session.
pub(crate) struct CurrentSession {
    pub(crate) user: User,
    pub(crate) session: Session,
}

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// Reads the session token from the cookie, falling back to a bearer header.
pub(crate) fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<(User, Session), ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

    let token = session_token(&parts.headers, &app_state.settings().security().cookie_name)
        .ok_or(ApiError::Unauthorized("Not signed in"))?;

    let claims = security::verify_token(&token, app_state.settings())
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

    let session = app_state
        .store()
        .find_session(&claims.sid)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .filter(|session| session.user_id == claims.sub)
        .ok_or(ApiError::Unauthorized("Session has ended"))?;

    if session.expires_at <= OffsetDateTime::now_utc() {
        return Err(ApiError::Unauthorized("Session has ended"));
    }

    let user = app_state
        .store()
        .find_user(&claims.sub)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    Ok((user, session))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = authenticate(parts, state).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, session) = authenticate(parts, state).await?;
        Ok(CurrentSession { user, session })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Admin {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

/// Loads the course and checks that `user` is enrolled in it. Admins pass
/// without an enrollment.
pub(crate) async fn require_course_member(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<Course, ApiError> {
    let course = state
        .store()
        .find_course(course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound(format!("course {course_id} not found")))?;

    if user.role == UserRole::Admin {
        return Ok(course);
    }

    let enrollment = state
        .store()
        .find_enrollment(&user.id, course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?;

    if enrollment.is_none() {
        return Err(ApiError::Forbidden("Enrollment required for this course"));
    }

    Ok(course)
}

/// Course authoring: enrolled faculty, or any admin.
pub(crate) async fn require_course_faculty(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<Course, ApiError> {
    let course = require_course_member(state, user, course_id).await?;

    if user.role.is_faculty() {
        return Ok(course);
    }

    Err(ApiError::Forbidden("Faculty access required for this course"))
}

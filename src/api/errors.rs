use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::repositories::RepoError;
use crate::services::attempts::AttemptError;
use crate::services::quizzes::QuizError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    kind: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    AlreadyCompleted(String),
    AttemptLimitExceeded(String),
    AttemptExpired(String),
    QuizUnavailable(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::AlreadyCompleted(_) => (StatusCode::CONFLICT, "already_completed"),
            ApiError::AttemptLimitExceeded(_) => (StatusCode::CONFLICT, "attempt_limit_exceeded"),
            ApiError::AttemptExpired(_) => (StatusCode::CONFLICT, "attempt_expired"),
            ApiError::QuizUnavailable(_) => (StatusCode::CONFLICT, "quiz_unavailable"),
            ApiError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let unauthorized = matches!(self, ApiError::Unauthorized(_));

        let detail = match self {
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::TooManyRequests(message) => message.to_string(),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                message
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::AlreadyCompleted(message)
            | ApiError::AttemptLimitExceeded(message)
            | ApiError::AttemptExpired(message)
            | ApiError::QuizUnavailable(message) => message,
        };

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), kind, detail })).into_response();
        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Missing { .. } => ApiError::NotFound(err.to_string()),
            RepoError::Conflict(message) => ApiError::Conflict(message),
            RepoError::Database(
                err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => {
                tracing::warn!(error = %err, "Database unreachable");
                ApiError::ServiceUnavailable("Database is temporarily unavailable".to_string())
            }
            RepoError::Database(err) => ApiError::internal(err, "Database operation failed"),
        }
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::CourseNotFound(_)
            | QuizError::QuizNotFound(_)
            | QuizError::QuestionNotFound(_) => ApiError::NotFound(err.to_string()),
            QuizError::Validation(message) => ApiError::BadRequest(message),
            QuizError::Repo(err) => err.into(),
        }
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::QuizNotFound(_) | AttemptError::AttemptNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            AttemptError::NotOwner => ApiError::Forbidden("Attempt belongs to another user"),
            AttemptError::AccessCode => ApiError::Forbidden("Access code is incorrect"),
            AttemptError::Unavailable(_) => ApiError::QuizUnavailable(err.to_string()),
            AttemptError::LimitExceeded(_) => ApiError::AttemptLimitExceeded(err.to_string()),
            AttemptError::AlreadyCompleted => ApiError::AlreadyCompleted(err.to_string()),
            AttemptError::Expired => ApiError::AttemptExpired(err.to_string()),
            AttemptError::Validation(message) => ApiError::BadRequest(message),
            AttemptError::Repo(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn body_carries_status_kind_and_detail() {
        let response =
            ApiError::from(AttemptError::LimitExceeded(2)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = test_support::read_json(response).await;
        assert_eq!(body["status"], 409);
        assert_eq!(body["kind"], "attempt_limit_exceeded");
        assert_eq!(body["detail"], "attempt limit of 2 reached");
    }

    #[tokio::test]
    async fn unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("Not signed in").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn repo_errors_map_to_http_kinds() {
        let missing = ApiError::from(RepoError::missing("course", "c1"));
        assert_eq!(missing.status_and_kind().1, "not_found");
        let conflict = ApiError::from(RepoError::Conflict("username taken".to_string()));
        assert_eq!(conflict.status_and_kind(), (StatusCode::CONFLICT, "conflict"));
    }

    #[tokio::test]
    async fn unreachable_database_is_service_unavailable() {
        let response = ApiError::from(RepoError::Database(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = test_support::read_json(response).await;
        assert_eq!(body["kind"], "service_unavailable");

        let other = ApiError::from(RepoError::Database(sqlx::Error::RowNotFound));
        assert_eq!(other.status_and_kind().1, "internal_error");
    }
}

mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/quizzes/:quiz_id/attempts",
            post(handlers::start_attempt).get(handlers::list_attempts),
        )
        .route("/quizzes/:quiz_id/attempts/latest", get(handlers::latest_attempt))
        .route("/quizzes/:quiz_id/attempts/:attempt_id", put(handlers::save_draft))
        .route("/quizzes/:quiz_id/attempts/:attempt_id/submit", post(handlers::submit_attempt))
}

mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/:course_id/quizzes",
            get(handlers::list_quizzes).post(handlers::create_quiz),
        )
        .route(
            "/quizzes/:quiz_id",
            get(handlers::get_quiz).put(handlers::update_quiz).delete(handlers::delete_quiz),
        )
        .route("/quizzes/:quiz_id/questions", post(handlers::add_question))
        .route(
            "/quizzes/:quiz_id/questions/:question_id",
            put(handlers::update_question).delete(handlers::delete_question),
        )
}

#[cfg(test)]
mod tests;

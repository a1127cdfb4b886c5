use std::collections::HashSet;

use sqlx::types::Json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{Question, Quiz};
use crate::db::types::{AssignmentGroup, QuizType};
use crate::repositories::RepoError;
use crate::schemas::quiz::{
    QuestionPayload, QuizCreate, QuizUpdate, DEFAULT_QUIZ_TITLE, DEFAULT_TIME_LIMIT_MINUTES,
};

#[derive(Debug, Error)]
pub(crate) enum QuizError {
    #[error("course {0} not found")]
    CourseNotFound(String),
    #[error("quiz {0} not found")]
    QuizNotFound(String),
    #[error("question {0} not found")]
    QuestionNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub(crate) async fn list_quizzes(
    state: &AppState,
    course_id: &str,
    include_unpublished: bool,
) -> Result<Vec<Quiz>, QuizError> {
    let quizzes = state.store().list_quizzes(course_id).await?;
    Ok(quizzes.into_iter().filter(|quiz| include_unpublished || quiz.published).collect())
}

pub(crate) async fn get_quiz(state: &AppState, quiz_id: &str) -> Result<Quiz, QuizError> {
    state
        .store()
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| QuizError::QuizNotFound(quiz_id.to_string()))
}

pub(crate) async fn create_quiz(
    state: &AppState,
    course_id: &str,
    payload: QuizCreate,
    now: OffsetDateTime,
) -> Result<Quiz, QuizError> {
    if state.store().find_course(course_id).await?.is_none() {
        return Err(QuizError::CourseNotFound(course_id.to_string()));
    }

    let time_limit = match payload.time_limit {
        Some(limit) => limit,
        None => Some(DEFAULT_TIME_LIMIT_MINUTES),
    };
    let mut quiz = Quiz {
        id: Uuid::new_v4().to_string(),
        course_id: course_id.to_string(),
        title: payload.title.map(|title| title.trim().to_string()).unwrap_or_else(|| {
            DEFAULT_QUIZ_TITLE.to_string()
        }),
        description: payload.description.unwrap_or_default(),
        quiz_type: payload.quiz_type.unwrap_or(QuizType::GradedQuiz),
        points: 0.0,
        assignment_group: payload.assignment_group.unwrap_or(AssignmentGroup::Quizzes),
        shuffle_answers: payload.shuffle_answers.unwrap_or(true),
        time_limit,
        multiple_attempts: payload.multiple_attempts.unwrap_or(false),
        how_many_attempts: payload.how_many_attempts.unwrap_or(1),
        show_correct_answers: payload.show_correct_answers.unwrap_or(false),
        access_code: normalize_access_code(payload.access_code),
        one_question_at_a_time: payload.one_question_at_a_time.unwrap_or(true),
        webcam_required: payload.webcam_required.unwrap_or(false),
        lock_questions_after_answering: payload.lock_questions_after_answering.unwrap_or(false),
        published: payload.published.unwrap_or(false),
        due_date: payload.due_date,
        available_date: payload.available_date,
        until_date: payload.until_date,
        questions: Json(build_questions(payload.questions)?),
        created_at: now,
        updated_at: now,
    };
    check_quiz(&quiz)?;
    quiz.recompute_points();

    let quiz = state.store().create_quiz(quiz).await?;
    tracing::info!(quiz_id = %quiz.id, course_id = %quiz.course_id, "Quiz created");
    Ok(quiz)
}

pub(crate) async fn update_quiz(
    state: &AppState,
    quiz_id: &str,
    patch: QuizUpdate,
    now: OffsetDateTime,
) -> Result<Quiz, QuizError> {
    let _guard = state.quiz_locks().acquire(quiz_id).await;
    let mut quiz = get_quiz(state, quiz_id).await?;

    apply_patch(&mut quiz, patch)?;
    check_quiz(&quiz)?;
    quiz.recompute_points();
    quiz.updated_at = now;

    state.store().save_quiz(&quiz).await?;
    Ok(quiz)
}

pub(crate) async fn delete_quiz(state: &AppState, quiz_id: &str) -> Result<(), QuizError> {
    let _guard = state.quiz_locks().acquire(quiz_id).await;
    if !state.store().delete_quiz(quiz_id).await? {
        return Err(QuizError::QuizNotFound(quiz_id.to_string()));
    }
    tracing::info!(quiz_id, "Quiz deleted with its attempts");
    Ok(())
}

pub(crate) async fn add_question(
    state: &AppState,
    quiz_id: &str,
    payload: QuestionPayload,
    now: OffsetDateTime,
) -> Result<Quiz, QuizError> {
    let _guard = state.quiz_locks().acquire(quiz_id).await;
    let mut quiz = get_quiz(state, quiz_id).await?;

    let question =
        payload.into_question(Uuid::new_v4().to_string()).map_err(QuizError::Validation)?;
    quiz.questions.0.push(question);
    quiz.recompute_points();
    quiz.updated_at = now;

    state.store().save_quiz(&quiz).await?;
    Ok(quiz)
}

pub(crate) async fn update_question(
    state: &AppState,
    quiz_id: &str,
    question_id: &str,
    payload: QuestionPayload,
    now: OffsetDateTime,
) -> Result<Quiz, QuizError> {
    let _guard = state.quiz_locks().acquire(quiz_id).await;
    let mut quiz = get_quiz(state, quiz_id).await?;

    let slot = quiz
        .questions
        .0
        .iter_mut()
        .find(|question| question.id == question_id)
        .ok_or_else(|| QuizError::QuestionNotFound(question_id.to_string()))?;
    *slot = payload.into_question(question_id.to_string()).map_err(QuizError::Validation)?;
    quiz.recompute_points();
    quiz.updated_at = now;

    state.store().save_quiz(&quiz).await?;
    Ok(quiz)
}

pub(crate) async fn delete_question(
    state: &AppState,
    quiz_id: &str,
    question_id: &str,
    now: OffsetDateTime,
) -> Result<Quiz, QuizError> {
    let _guard = state.quiz_locks().acquire(quiz_id).await;
    let mut quiz = get_quiz(state, quiz_id).await?;

    let before = quiz.questions.0.len();
    quiz.questions.0.retain(|question| question.id != question_id);
    if quiz.questions.0.len() == before {
        return Err(QuizError::QuestionNotFound(question_id.to_string()));
    }
    quiz.recompute_points();
    quiz.updated_at = now;

    state.store().save_quiz(&quiz).await?;
    Ok(quiz)
}

fn apply_patch(quiz: &mut Quiz, patch: QuizUpdate) -> Result<(), QuizError> {
    if let Some(title) = patch.title {
        quiz.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        quiz.description = description;
    }
    if let Some(quiz_type) = patch.quiz_type {
        quiz.quiz_type = quiz_type;
    }
    if let Some(group) = patch.assignment_group {
        quiz.assignment_group = group;
    }
    if let Some(shuffle) = patch.shuffle_answers {
        quiz.shuffle_answers = shuffle;
    }
    if let Some(time_limit) = patch.time_limit {
        quiz.time_limit = time_limit;
    }
    if let Some(multiple) = patch.multiple_attempts {
        quiz.multiple_attempts = multiple;
    }
    if let Some(count) = patch.how_many_attempts {
        quiz.how_many_attempts = count;
    }
    if let Some(show) = patch.show_correct_answers {
        quiz.show_correct_answers = show;
    }
    if let Some(code) = patch.access_code {
        quiz.access_code = normalize_access_code(code);
    }
    if let Some(one_at_a_time) = patch.one_question_at_a_time {
        quiz.one_question_at_a_time = one_at_a_time;
    }
    if let Some(webcam) = patch.webcam_required {
        quiz.webcam_required = webcam;
    }
    if let Some(lock) = patch.lock_questions_after_answering {
        quiz.lock_questions_after_answering = lock;
    }
    if let Some(published) = patch.published {
        quiz.published = published;
    }
    if let Some(due) = patch.due_date {
        quiz.due_date = due;
    }
    if let Some(available) = patch.available_date {
        quiz.available_date = available;
    }
    if let Some(until) = patch.until_date {
        quiz.until_date = until;
    }
    if let Some(payloads) = patch.questions {
        quiz.questions = Json(build_questions(payloads)?);
    }
    Ok(())
}

/// Existing ids are kept; ids that are missing, blank, or repeated get a
/// fresh one.
fn build_questions(payloads: Vec<QuestionPayload>) -> Result<Vec<Question>, QuizError> {
    let mut seen = HashSet::new();
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, mut payload)| {
            let id = payload
                .id
                .take()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty() && seen.insert(id.clone()))
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            payload
                .into_question(id)
                .map_err(|err| QuizError::Validation(format!("question {}: {err}", index + 1)))
        })
        .collect()
}

fn normalize_access_code(code: Option<String>) -> Option<String> {
    code.map(|code| code.trim().to_string()).filter(|code| !code.is_empty())
}

fn check_quiz(quiz: &Quiz) -> Result<(), QuizError> {
    if quiz.title.is_empty() {
        return Err(QuizError::Validation("title must not be empty".to_string()));
    }
    if quiz.time_limit.is_some_and(|minutes| minutes < 1) {
        return Err(QuizError::Validation("timeLimit must be at least 1 minute".to_string()));
    }
    if quiz.how_many_attempts < 1 {
        return Err(QuizError::Validation("howManyAttempts must be at least 1".to_string()));
    }
    if let (Some(available), Some(until)) = (quiz.available_date, quiz.until_date) {
        if until < available {
            return Err(QuizError::Validation(
                "untilDate must not be before availableDate".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;

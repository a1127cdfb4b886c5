use std::collections::HashSet;

use sqlx::types::Json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::{metrics, state::AppState};
use crate::db::models::{AttemptAnswer, Quiz, QuizAttempt, User};
use crate::db::types::AttemptStatus;
use crate::repositories::RepoError;
use crate::services::grading;
use crate::services::quiz_timing::{self, Availability};

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("quiz {0} not found")]
    QuizNotFound(String),
    #[error("attempt {0} not found")]
    AttemptNotFound(String),
    #[error("attempt belongs to another user")]
    NotOwner,
    #[error("{0}")]
    Unavailable(&'static str),
    #[error("access code is incorrect")]
    AccessCode,
    #[error("attempt limit of {0} reached")]
    LimitExceeded(i64),
    #[error("attempt is already completed")]
    AlreadyCompleted,
    #[error("attempt deadline has passed; it was submitted with the last saved answers")]
    Expired,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A submitted answer before grading.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnswerInput {
    pub(crate) question_id: String,
    pub(crate) answer: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: QuizAttempt,
    pub(crate) resumed: bool,
}

/// Starts or resumes `user`'s attempt. Faculty starts are previews and skip
/// the publish, window, access code, and cap checks.
pub(crate) async fn start_attempt(
    state: &AppState,
    quiz_id: &str,
    user: &User,
    access_code: Option<&str>,
    now: OffsetDateTime,
) -> Result<StartedAttempt, AttemptError> {
    let _guard = state.quiz_locks().acquire(&format!("start:{quiz_id}:{}", user.id)).await;
    let quiz = load_quiz(state, quiz_id).await?;
    let preview = user.role.is_faculty();

    if !preview {
        if !quiz.published {
            return Err(AttemptError::Unavailable("quiz is not published"));
        }
        match quiz_timing::availability(&quiz, now) {
            Availability::Open => {}
            Availability::NotYetOpen => {
                return Err(AttemptError::Unavailable("quiz is not available yet"))
            }
            Availability::Closed => return Err(AttemptError::Unavailable("quiz is closed")),
        }
    }

    if let Some(latest) = state.store().latest_attempt(quiz_id, &user.id).await? {
        if !latest.is_completed() {
            let settled = settle(state, &quiz, latest, now).await?;
            if !settled.is_completed() {
                metrics::record_attempt_event("resumed");
                return Ok(StartedAttempt { attempt: settled, resumed: true });
            }
        }
    }

    if !preview {
        if let Some(expected) = quiz.access_code.as_deref() {
            if access_code.map(str::trim) != Some(expected) {
                return Err(AttemptError::AccessCode);
            }
        }
    }

    let used = state.store().count_attempts(quiz_id, &user.id).await?;
    if !preview && used >= quiz.attempt_cap() {
        return Err(AttemptError::LimitExceeded(quiz.attempt_cap()));
    }

    let attempt = QuizAttempt {
        id: Uuid::new_v4().to_string(),
        quiz_id: quiz.id.clone(),
        user_id: user.id.clone(),
        attempt_number: i32::try_from(used + 1).unwrap_or(i32::MAX),
        status: AttemptStatus::InProgress,
        answers: Json(Vec::new()),
        score: None,
        total_points: quiz.points,
        started_at: now,
        expires_at: quiz_timing::compute_expires_at(&quiz, now, preview),
        submitted_at: None,
        updated_at: now,
    };
    let attempt = state.store().create_attempt(attempt).await?;

    metrics::record_attempt_event(if preview { "preview" } else { "started" });
    tracing::info!(
        quiz_id,
        user_id = %user.id,
        attempt_id = %attempt.id,
        attempt_number = attempt.attempt_number,
        preview,
        "Quiz attempt started"
    );
    Ok(StartedAttempt { attempt, resumed: false })
}

pub(crate) async fn save_draft(
    state: &AppState,
    quiz_id: &str,
    attempt_id: &str,
    user: &User,
    answers: Vec<AnswerInput>,
    now: OffsetDateTime,
) -> Result<QuizAttempt, AttemptError> {
    let _guard = state.attempt_locks().acquire(attempt_id).await;
    let mut attempt = load_owned_attempt(state, quiz_id, attempt_id, user).await?;
    if attempt.is_completed() {
        return Err(AttemptError::AlreadyCompleted);
    }
    let quiz = load_quiz(state, quiz_id).await?;
    if past_deadline(state, &attempt, now) {
        finalize(state, &quiz, &mut attempt, now, true).await?;
        return Err(AttemptError::Expired);
    }
    // Grace covers the final submit only; drafts stop at expiresAt.
    if quiz_timing::is_past_deadline(attempt.expires_at, 0, now) {
        return Err(AttemptError::Expired);
    }

    attempt.answers = Json(to_stored_answers(&quiz, answers)?);
    attempt.updated_at = now;
    state.store().save_attempt(&attempt).await?;

    metrics::record_attempt_event("draft_saved");
    Ok(attempt)
}

/// Grades and completes the attempt. Supplied answers replace the draft.
pub(crate) async fn submit_attempt(
    state: &AppState,
    quiz_id: &str,
    attempt_id: &str,
    user: &User,
    answers: Option<Vec<AnswerInput>>,
    now: OffsetDateTime,
) -> Result<QuizAttempt, AttemptError> {
    let _guard = state.attempt_locks().acquire(attempt_id).await;
    let mut attempt = load_owned_attempt(state, quiz_id, attempt_id, user).await?;
    if attempt.is_completed() {
        return Err(AttemptError::AlreadyCompleted);
    }
    let quiz = load_quiz(state, quiz_id).await?;
    if past_deadline(state, &attempt, now) {
        finalize(state, &quiz, &mut attempt, now, true).await?;
        return Err(AttemptError::Expired);
    }

    if let Some(answers) = answers {
        attempt.answers = Json(to_stored_answers(&quiz, answers)?);
    }
    finalize(state, &quiz, &mut attempt, now, false).await?;
    Ok(attempt)
}

pub(crate) async fn latest_attempt(
    state: &AppState,
    quiz_id: &str,
    user: &User,
    now: OffsetDateTime,
) -> Result<Option<QuizAttempt>, AttemptError> {
    let quiz = load_quiz(state, quiz_id).await?;
    match state.store().latest_attempt(quiz_id, &user.id).await? {
        Some(attempt) => Ok(Some(settle(state, &quiz, attempt, now).await?)),
        None => Ok(None),
    }
}

/// All attempts of a quiz, or only `user_id`'s when given.
pub(crate) async fn list_attempts(
    state: &AppState,
    quiz_id: &str,
    user_id: Option<&str>,
    now: OffsetDateTime,
) -> Result<Vec<QuizAttempt>, AttemptError> {
    let quiz = load_quiz(state, quiz_id).await?;
    let attempts = state.store().list_attempts(quiz_id, user_id).await?;
    let mut settled = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        settled.push(settle(state, &quiz, attempt, now).await?);
    }
    Ok(settled)
}

pub(crate) async fn has_completed_attempt(
    state: &AppState,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, AttemptError> {
    let attempts = state.store().list_attempts(quiz_id, Some(user_id)).await?;
    Ok(attempts.iter().any(QuizAttempt::is_completed))
}

/// Finalizes an in-progress attempt whose deadline has passed. Anything else
/// is returned unchanged.
async fn settle(
    state: &AppState,
    quiz: &Quiz,
    attempt: QuizAttempt,
    now: OffsetDateTime,
) -> Result<QuizAttempt, AttemptError> {
    if attempt.is_completed() || !past_deadline(state, &attempt, now) {
        return Ok(attempt);
    }

    let _guard = state.attempt_locks().acquire(&attempt.id).await;
    let Some(mut current) = state.store().find_attempt(&attempt.id).await? else {
        return Err(AttemptError::AttemptNotFound(attempt.id));
    };
    if !current.is_completed() {
        finalize(state, quiz, &mut current, now, true).await?;
    }
    Ok(current)
}

async fn finalize(
    state: &AppState,
    quiz: &Quiz,
    attempt: &mut QuizAttempt,
    now: OffsetDateTime,
    expired: bool,
) -> Result<(), AttemptError> {
    let graded = grading::grade_attempt(&quiz.questions.0, &attempt.answers.0);
    attempt.answers = Json(graded.answers);
    attempt.score = Some(graded.score);
    attempt.total_points = quiz.points;
    attempt.status = AttemptStatus::Completed;
    attempt.submitted_at = Some(if expired { attempt.expires_at.unwrap_or(now) } else { now });
    attempt.updated_at = now;
    state.store().save_attempt(attempt).await?;

    metrics::record_attempt_event(if expired { "expired" } else { "submitted" });
    metrics::record_attempt_score(graded.score, quiz.points);
    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id = %quiz.id,
        score = graded.score,
        total_points = quiz.points,
        expired,
        "Quiz attempt completed"
    );
    Ok(())
}

fn past_deadline(state: &AppState, attempt: &QuizAttempt, now: OffsetDateTime) -> bool {
    quiz_timing::is_past_deadline(
        attempt.expires_at,
        state.settings().quiz().submit_grace_seconds,
        now,
    )
}

async fn load_quiz(state: &AppState, quiz_id: &str) -> Result<Quiz, AttemptError> {
    state
        .store()
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| AttemptError::QuizNotFound(quiz_id.to_string()))
}

async fn load_owned_attempt(
    state: &AppState,
    quiz_id: &str,
    attempt_id: &str,
    user: &User,
) -> Result<QuizAttempt, AttemptError> {
    let attempt = state
        .store()
        .find_attempt(attempt_id)
        .await?
        .filter(|attempt| attempt.quiz_id == quiz_id)
        .ok_or_else(|| AttemptError::AttemptNotFound(attempt_id.to_string()))?;
    if attempt.user_id != user.id {
        return Err(AttemptError::NotOwner);
    }
    Ok(attempt)
}

fn to_stored_answers(
    quiz: &Quiz,
    answers: Vec<AnswerInput>,
) -> Result<Vec<AttemptAnswer>, AttemptError> {
    let mut seen = HashSet::new();
    answers
        .into_iter()
        .map(|input| {
            if quiz.find_question(&input.question_id).is_none() {
                return Err(AttemptError::Validation(format!(
                    "unknown question {}",
                    input.question_id
                )));
            }
            if !seen.insert(input.question_id.clone()) {
                return Err(AttemptError::Validation(format!(
                    "question {} answered more than once",
                    input.question_id
                )));
            }
            Ok(AttemptAnswer {
                question_id: input.question_id,
                answer: input.answer,
                is_correct: None,
                points_earned: None,
            })
        })
        .collect()
}

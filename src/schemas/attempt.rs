use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::format_offset;
use crate::db::models::{AttemptAnswer, QuizAttempt};
use crate::db::types::AttemptStatus;
use crate::services::attempts::AnswerInput;
use crate::services::quiz_timing;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptStart {
    #[serde(default)]
    pub(crate) access_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerPayload {
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) answer: Vec<String>,
}

impl From<AnswerPayload> for AnswerInput {
    fn from(payload: AnswerPayload) -> Self {
        AnswerInput { question_id: payload.question_id, answer: payload.answer }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptDraft {
    pub(crate) answers: Vec<AnswerPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AttemptSubmit {
    #[serde(default)]
    pub(crate) answers: Option<Vec<AnswerPayload>>,
}

pub(crate) fn into_inputs(answers: Vec<AnswerPayload>) -> Vec<AnswerInput> {
    answers.into_iter().map(AnswerInput::from).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptAnswerResponse {
    pub(crate) question_id: String,
    pub(crate) answer: Vec<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_earned: Option<f64>,
}

impl AttemptAnswerResponse {
    fn from_db(answer: &AttemptAnswer, reveal_grading: bool) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            answer: answer.answer.clone(),
            is_correct: answer.is_correct.filter(|_| reveal_grading),
            points_earned: answer.points_earned.filter(|_| reveal_grading),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) completed: bool,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) answers: Vec<AttemptAnswerResponse>,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) updated_at: String,
    /// Server-computed so clients with skewed clocks still count down right.
    #[serde(default)]
    pub(crate) seconds_remaining: Option<i64>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: &QuizAttempt, now: OffsetDateTime) -> Self {
        let completed = attempt.is_completed();
        Self {
            id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            user_id: attempt.user_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            completed,
            score: attempt.score,
            total_points: attempt.total_points,
            answers: attempt
                .answers
                .0
                .iter()
                .map(|answer| AttemptAnswerResponse::from_db(answer, completed))
                .collect(),
            started_at: format_offset(attempt.started_at),
            expires_at: attempt.expires_at.map(format_offset),
            submitted_at: attempt.submitted_at.map(format_offset),
            updated_at: format_offset(attempt.updated_at),
            seconds_remaining: if completed {
                None
            } else {
                quiz_timing::seconds_remaining(attempt.expires_at, now)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use time::macros::datetime;
    use time::Duration;

    fn attempt(status: AttemptStatus) -> QuizAttempt {
        let started = datetime!(2026-03-01 10:00 UTC);
        QuizAttempt {
            id: "a1".to_string(),
            quiz_id: "q1".to_string(),
            user_id: "u1".to_string(),
            attempt_number: 1,
            status,
            answers: Json(vec![AttemptAnswer {
                question_id: "x".to_string(),
                answer: vec!["True".to_string()],
                is_correct: Some(true),
                points_earned: Some(5.0),
            }]),
            score: None,
            total_points: 5.0,
            started_at: started,
            expires_at: Some(started + Duration::minutes(20)),
            submitted_at: None,
            updated_at: started,
        }
    }

    #[test]
    fn in_progress_attempts_count_down() {
        let now = datetime!(2026-03-01 10:05 UTC);
        let response = AttemptResponse::from_db(&attempt(AttemptStatus::InProgress), now);
        assert!(!response.completed);
        assert_eq!(response.seconds_remaining, Some(15 * 60));
        assert_eq!(response.answers[0].is_correct, None);

        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["status"], "IN_PROGRESS");
        assert_eq!(value["expiresAt"], "2026-03-01T10:20:00Z");
    }

    #[test]
    fn completed_attempts_show_grading() {
        let now = datetime!(2026-03-01 11:00 UTC);
        let response = AttemptResponse::from_db(&attempt(AttemptStatus::Completed), now);
        assert!(response.completed);
        assert_eq!(response.seconds_remaining, None);
        assert_eq!(response.answers[0].points_earned, Some(5.0));
    }
}

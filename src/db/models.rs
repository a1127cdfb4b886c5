use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::db::types::{AssignmentGroup, AttemptStatus, QuizType, UserRole};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: Option<String>,
    pub(crate) section: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) last_activity: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) number: String,
    pub(crate) department: Option<String>,
    pub(crate) credits: Option<i32>,
    pub(crate) description: String,
    pub(crate) start_date: Option<Date>,
    pub(crate) end_date: Option<Date>,
    pub(crate) author: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Lesson {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CourseModule {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) lessons: Json<Vec<Lesson>>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) points: f64,
    pub(crate) due_date: Option<OffsetDateTime>,
    pub(crate) available_date: Option<OffsetDateTime>,
    pub(crate) until_date: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

/// A question owned by a quiz. Stored inline with its quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) kind: QuestionKind,
}

/// Per-type answer key. Each variant only carries what grading needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionKind {
    MultipleChoice { choices: Vec<String>, correct_answers: Vec<String> },
    TrueFalse { answer: bool },
    FillInBlank { answers: Vec<String> },
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) quiz_type: QuizType,
    pub(crate) points: f64,
    pub(crate) assignment_group: AssignmentGroup,
    pub(crate) shuffle_answers: bool,
    pub(crate) time_limit: Option<i32>,
    pub(crate) multiple_attempts: bool,
    pub(crate) how_many_attempts: i32,
    pub(crate) show_correct_answers: bool,
    pub(crate) access_code: Option<String>,
    pub(crate) one_question_at_a_time: bool,
    pub(crate) webcam_required: bool,
    pub(crate) lock_questions_after_answering: bool,
    pub(crate) published: bool,
    pub(crate) due_date: Option<OffsetDateTime>,
    pub(crate) available_date: Option<OffsetDateTime>,
    pub(crate) until_date: Option<OffsetDateTime>,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl Quiz {
    pub(crate) fn question_points(&self) -> f64 {
        self.questions.0.iter().map(|question| question.points).sum()
    }

    pub(crate) fn recompute_points(&mut self) {
        self.points = self.question_points();
    }

    /// Number of attempts a student may start.
    pub(crate) fn attempt_cap(&self) -> i64 {
        if self.multiple_attempts {
            i64::from(self.how_many_attempts.max(1))
        } else {
            1
        }
    }

    pub(crate) fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.questions.0.iter().find(|question| question.id == question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AttemptAnswer {
    pub(crate) question_id: String,
    pub(crate) answer: Vec<String>,
    #[serde(default)]
    pub(crate) is_correct: Option<bool>,
    #[serde(default)]
    pub(crate) points_earned: Option<f64>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizAttempt {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Json<Vec<AttemptAnswer>>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) expires_at: Option<OffsetDateTime>,
    pub(crate) submitted_at: Option<OffsetDateTime>,
    pub(crate) updated_at: OffsetDateTime,
}

impl QuizAttempt {
    pub(crate) fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }
}

//! Wire shapes as the browser-facing client sees them. These mirror the
//! server's JSON, not its storage rows.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Ta,
    Faculty,
    Admin,
}

impl Role {
    pub fn can_author(self) -> bool {
        matches!(self, Role::Faculty | Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub credits: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizType {
    GradedQuiz,
    PracticeQuiz,
    GradedSurvey,
    UngradedSurvey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentGroup {
    Quizzes,
    Exams,
    Assignments,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
}

/// A question in the flat shape the API exchanges. `id` is `None` until the
/// server has stored the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub points: f64,
    #[serde(rename = "question", default)]
    pub prompt: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
}

impl Question {
    pub fn blank(question_type: QuestionType) -> Self {
        let mut question = Self {
            id: None,
            title: "New Question".to_string(),
            question_type: QuestionType::MultipleChoice,
            points: 0.0,
            prompt: String::new(),
            choices: Vec::new(),
            correct_answers: Vec::new(),
        };
        question.retype(question_type);
        question
    }

    /// Switches the question type. Fields that do not carry over are reset
    /// to the new type's starting values; title, prompt and points stay.
    pub fn retype(&mut self, question_type: QuestionType) {
        self.question_type = question_type;
        match question_type {
            QuestionType::TrueFalse => {
                self.choices = vec!["True".to_string(), "False".to_string()];
                self.correct_answers = vec!["True".to_string()];
            }
            QuestionType::MultipleChoice | QuestionType::FillInBlank => {
                self.choices.clear();
                self.correct_answers.clear();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub course: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub points: f64,
    pub assignment_group: AssignmentGroup,
    pub shuffle_answers: bool,
    pub time_limit: Option<i32>,
    pub multiple_attempts: bool,
    pub how_many_attempts: i32,
    pub show_correct_answers: bool,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default, skip_serializing)]
    pub requires_access_code: bool,
    pub one_question_at_a_time: bool,
    pub webcam_required: bool,
    pub lock_questions_after_answering: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub available_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub until_date: Option<OffsetDateTime>,
    pub published: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question_points(&self) -> f64 {
        self.questions.iter().map(|question| question.points).sum()
    }

    pub fn attempt_cap(&self) -> i32 {
        if self.multiple_attempts {
            self.how_many_attempts.max(1)
        } else {
            1
        }
    }
}

/// Fields for creating a quiz. Unset fields take the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuiz {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub answer: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: String,
    #[serde(default)]
    pub answer: Vec<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub points_earned: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub completed: bool,
    #[serde(default)]
    pub score: Option<f64>,
    pub total_points: f64,
    #[serde(default)]
    pub answers: Vec<AttemptAnswer>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub seconds_remaining: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retype_resets_fields_that_do_not_carry_over() {
        let mut question = Question::blank(QuestionType::MultipleChoice);
        question.title = "Borrowing".to_string();
        question.points = 4.0;
        question.choices = vec!["&T".to_string(), "&mut T".to_string()];
        question.correct_answers = vec!["&T".to_string()];

        question.retype(QuestionType::TrueFalse);
        assert_eq!(question.choices, vec!["True", "False"]);
        assert_eq!(question.correct_answers, vec!["True"]);
        assert_eq!(question.title, "Borrowing");
        assert_eq!(question.points, 4.0);

        question.retype(QuestionType::FillInBlank);
        assert!(question.choices.is_empty());
        assert!(question.correct_answers.is_empty());
    }

    #[test]
    fn quiz_reads_server_json_and_omits_read_only_fields() {
        let quiz: Quiz = serde_json::from_value(json!({
            "_id": "Q1", "course": "RS101", "title": "Ownership", "description": "",
            "quizType": "GRADED_QUIZ", "points": 5.0, "assignmentGroup": "QUIZZES",
            "shuffleAnswers": true, "timeLimit": null, "multipleAttempts": false,
            "howManyAttempts": 1, "showCorrectAnswers": false, "accessCode": null,
            "requiresAccessCode": true, "oneQuestionAtATime": true, "webcamRequired": false,
            "lockQuestionsAfterAnswering": false, "dueDate": "2026-05-13T23:59:00Z",
            "availableDate": null, "untilDate": null, "published": true, "questions": []
        }))
        .expect("quiz");
        assert!(quiz.requires_access_code);
        assert!(quiz.due_date.is_some());

        let value = serde_json::to_value(&quiz).expect("serialize");
        assert!(value.get("requiresAccessCode").is_none());
        assert_eq!(value["dueDate"], "2026-05-13T23:59:00Z");
        assert!(value["timeLimit"].is_null());
    }
}

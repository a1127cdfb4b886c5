use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_offset;
use crate::db::models::{Question, QuestionKind, Quiz};
use crate::db::types::{AssignmentGroup, QuizType};
use crate::schemas::fields::{nullable, nullable_timestamp, optional_number, optional_timestamp};
use crate::services::grading::true_false_label;

pub(crate) const DEFAULT_QUIZ_TITLE: &str = "Unnamed Quiz";
pub(crate) const DEFAULT_TIME_LIMIT_MINUTES: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
}

impl QuestionType {
    pub(crate) fn of(kind: &QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice { .. } => Self::MultipleChoice,
            QuestionKind::TrueFalse { .. } => Self::TrueFalse,
            QuestionKind::FillInBlank { .. } => Self::FillInBlank,
        }
    }
}

/// Flat question shape shared by requests and responses. Type-specific
/// fields that do not apply to `type` are ignored on input and normalized
/// on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionPayload {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(default, deserialize_with = "optional_number")]
    pub(crate) points: Option<f64>,
    #[serde(rename = "question", default)]
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) choices: Vec<String>,
    #[serde(default)]
    pub(crate) correct_answers: Vec<String>,
}

impl QuestionPayload {
    /// Builds the typed question. The caller supplies the id so existing
    /// questions keep theirs.
    pub(crate) fn into_question(self, id: String) -> Result<Question, String> {
        let points = self.points.unwrap_or(0.0);
        if !points.is_finite() || points < 0.0 {
            return Err("question points must be a non-negative number".to_string());
        }

        let kind = match self.question_type {
            QuestionType::MultipleChoice => {
                let choices: Vec<String> =
                    self.choices.into_iter().map(|choice| choice.trim().to_string()).collect();
                if choices.len() < 2 {
                    return Err("multiple choice questions need at least 2 choices".to_string());
                }
                if choices.iter().any(String::is_empty) {
                    return Err("choices must not be blank".to_string());
                }
                let correct_answers: Vec<String> = self
                    .correct_answers
                    .into_iter()
                    .map(|answer| answer.trim().to_string())
                    .collect();
                if correct_answers.is_empty() {
                    return Err("multiple choice questions need at least 1 correct answer".to_string());
                }
                if let Some(stray) = correct_answers.iter().find(|answer| !choices.contains(answer)) {
                    return Err(format!("correct answer '{stray}' is not one of the choices"));
                }
                QuestionKind::MultipleChoice { choices, correct_answers }
            }
            QuestionType::TrueFalse => {
                let [value] = self.correct_answers.as_slice() else {
                    return Err("true/false questions need exactly 1 correct answer".to_string());
                };
                let answer = match value.trim() {
                    value if value.eq_ignore_ascii_case("true") => true,
                    value if value.eq_ignore_ascii_case("false") => false,
                    other => {
                        return Err(format!("true/false answer must be True or False, got '{other}'"))
                    }
                };
                QuestionKind::TrueFalse { answer }
            }
            QuestionType::FillInBlank => {
                let answers: Vec<String> = self
                    .correct_answers
                    .into_iter()
                    .map(|answer| answer.trim().to_string())
                    .filter(|answer| !answer.is_empty())
                    .collect();
                if answers.is_empty() {
                    return Err("fill in the blank questions need at least 1 answer".to_string());
                }
                QuestionKind::FillInBlank { answers }
            }
        };

        Ok(Question { id, title: self.title.trim().to_string(), prompt: self.prompt, points, kind })
    }

    pub(crate) fn from_question(question: &Question, reveal_answers: bool) -> Self {
        let (choices, correct_answers) = match &question.kind {
            QuestionKind::MultipleChoice { choices, correct_answers } => {
                (choices.clone(), correct_answers.clone())
            }
            QuestionKind::TrueFalse { answer } => (
                vec![true_false_label(true).to_string(), true_false_label(false).to_string()],
                vec![true_false_label(*answer).to_string()],
            ),
            QuestionKind::FillInBlank { answers } => (Vec::new(), answers.clone()),
        };

        Self {
            id: Some(question.id.clone()),
            title: question.title.clone(),
            question_type: QuestionType::of(&question.kind),
            points: Some(question.points),
            prompt: question.prompt.clone(),
            choices,
            correct_answers: if reveal_answers { correct_answers } else { Vec::new() },
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizCreate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) quiz_type: Option<QuizType>,
    #[serde(default)]
    pub(crate) assignment_group: Option<AssignmentGroup>,
    #[serde(default)]
    pub(crate) shuffle_answers: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) time_limit: Option<Option<i32>>,
    #[serde(default)]
    pub(crate) multiple_attempts: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 1, message = "howManyAttempts must be at least 1"))]
    pub(crate) how_many_attempts: Option<i32>,
    #[serde(default)]
    pub(crate) show_correct_answers: Option<bool>,
    #[serde(default)]
    pub(crate) access_code: Option<String>,
    #[serde(default)]
    pub(crate) one_question_at_a_time: Option<bool>,
    #[serde(default)]
    pub(crate) webcam_required: Option<bool>,
    #[serde(default)]
    pub(crate) lock_questions_after_answering: Option<bool>,
    #[serde(default)]
    pub(crate) published: Option<bool>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) due_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) available_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) until_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionPayload>,
}

/// Partial update. Absent fields are left alone, `null` clears the optional
/// ones. `points` is not accepted; it is derived from the questions.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) quiz_type: Option<QuizType>,
    #[serde(default)]
    pub(crate) assignment_group: Option<AssignmentGroup>,
    #[serde(default)]
    pub(crate) shuffle_answers: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) time_limit: Option<Option<i32>>,
    #[serde(default)]
    pub(crate) multiple_attempts: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 1, message = "howManyAttempts must be at least 1"))]
    pub(crate) how_many_attempts: Option<i32>,
    #[serde(default)]
    pub(crate) show_correct_answers: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) access_code: Option<Option<String>>,
    #[serde(default)]
    pub(crate) one_question_at_a_time: Option<bool>,
    #[serde(default)]
    pub(crate) webcam_required: Option<bool>,
    #[serde(default)]
    pub(crate) lock_questions_after_answering: Option<bool>,
    #[serde(default)]
    pub(crate) published: Option<bool>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) due_date: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) available_date: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) until_date: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<QuestionPayload>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) course: String,
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
    /// Lets students know a code is needed without seeing it.
    #[serde(default)]
    pub(crate) requires_access_code: bool,
    pub(crate) one_question_at_a_time: bool,
    pub(crate) webcam_required: bool,
    pub(crate) lock_questions_after_answering: bool,
    pub(crate) due_date: Option<String>,
    pub(crate) available_date: Option<String>,
    pub(crate) until_date: Option<String>,
    pub(crate) published: bool,
    pub(crate) questions: Vec<QuestionPayload>,
    #[serde(default)]
    pub(crate) created_at: Option<String>,
    #[serde(default)]
    pub(crate) updated_at: Option<String>,
}

/// How much of a quiz the caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuizView {
    /// Faculty: everything.
    Full,
    /// Student after a completed attempt on a quiz that shows answers.
    StudentWithAnswers,
    /// Student: no answer keys, no access code.
    Student,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: &Quiz, view: QuizView) -> Self {
        let reveal_answers = view != QuizView::Student;
        let requires_access_code =
            quiz.access_code.as_deref().is_some_and(|code| !code.trim().is_empty());
        Self {
            id: quiz.id.clone(),
            course: quiz.course_id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            quiz_type: quiz.quiz_type,
            points: quiz.points,
            assignment_group: quiz.assignment_group,
            shuffle_answers: quiz.shuffle_answers,
            time_limit: quiz.time_limit,
            multiple_attempts: quiz.multiple_attempts,
            how_many_attempts: quiz.how_many_attempts,
            show_correct_answers: quiz.show_correct_answers,
            access_code: if view == QuizView::Full { quiz.access_code.clone() } else { None },
            requires_access_code,
            one_question_at_a_time: quiz.one_question_at_a_time,
            webcam_required: quiz.webcam_required,
            lock_questions_after_answering: quiz.lock_questions_after_answering,
            due_date: quiz.due_date.map(format_offset),
            available_date: quiz.available_date.map(format_offset),
            until_date: quiz.until_date.map(format_offset),
            published: quiz.published,
            questions: quiz
                .questions
                .0
                .iter()
                .map(|question| QuestionPayload::from_question(question, reveal_answers))
                .collect(),
            created_at: Some(format_offset(quiz.created_at)),
            updated_at: Some(format_offset(quiz.updated_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> QuestionPayload {
        serde_json::from_value(value).expect("payload")
    }

    #[test]
    fn multiple_choice_requires_two_choices_and_a_member_answer() {
        let too_few = payload(json!({
            "type": "MULTIPLE_CHOICE", "points": 2, "choices": ["A"], "correctAnswers": ["A"]
        }));
        assert!(too_few.into_question("q".into()).is_err());

        let stray = payload(json!({
            "type": "MULTIPLE_CHOICE", "choices": ["A", "B"], "correctAnswers": ["C"]
        }));
        assert!(stray.into_question("q".into()).unwrap_err().contains("not one of the choices"));

        let none = payload(json!({
            "type": "MULTIPLE_CHOICE", "choices": ["A", "B"], "correctAnswers": []
        }));
        assert!(none.into_question("q".into()).is_err());
    }

    #[test]
    fn true_false_needs_exactly_one_answer() {
        let missing = payload(json!({"type": "TRUE_FALSE", "points": 1, "correctAnswers": []}));
        assert!(missing.into_question("q".into()).unwrap_err().contains("exactly 1"));

        let both = payload(json!({
            "type": "TRUE_FALSE", "points": 1, "correctAnswers": ["True", "False"]
        }));
        assert!(both.into_question("q".into()).is_err());

        let maybe = payload(json!({"type": "TRUE_FALSE", "correctAnswers": ["Maybe"]}));
        assert!(maybe.into_question("q".into()).is_err());
    }

    #[test]
    fn true_false_ignores_supplied_choices() {
        let question = payload(json!({
            "type": "TRUE_FALSE", "points": 5,
            "choices": ["a", "b", "c", "d", "e"], "correctAnswers": ["false"]
        }))
        .into_question("q".into())
        .expect("question");

        assert_eq!(question.kind, QuestionKind::TrueFalse { answer: false });
        let wire = QuestionPayload::from_question(&question, true);
        assert_eq!(wire.choices, vec!["True", "False"]);
        assert_eq!(wire.correct_answers, vec!["False"]);
    }

    #[test]
    fn fill_in_blank_drops_choices_and_blank_answers() {
        let question = payload(json!({
            "type": "FILL_IN_BLANK", "choices": ["x", "y"], "correctAnswers": ["Paris", "  "]
        }))
        .into_question("q".into())
        .expect("question");

        assert_eq!(question.kind, QuestionKind::FillInBlank { answers: vec!["Paris".into()] });
        assert!(QuestionPayload::from_question(&question, true).choices.is_empty());
    }

    #[test]
    fn negative_points_are_rejected() {
        let question = payload(json!({
            "type": "TRUE_FALSE", "points": -1, "correctAnswers": ["True"]
        }));
        assert!(question.into_question("q".into()).is_err());
    }

    #[test]
    fn student_view_hides_keys_and_code() {
        let question = payload(json!({
            "type": "FILL_IN_BLANK", "points": 3, "correctAnswers": ["Paris"]
        }))
        .into_question("q".into())
        .expect("question");
        let redacted = QuestionPayload::from_question(&question, false);
        assert!(redacted.correct_answers.is_empty());
        assert_eq!(redacted.points, Some(3.0));
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: QuizUpdate =
            serde_json::from_value(json!({"accessCode": null, "timeLimit": 30})).expect("update");
        assert_eq!(update.access_code, Some(None));
        assert_eq!(update.time_limit, Some(Some(30)));
        assert!(update.until_date.is_none());
        assert!(update.questions.is_none());
    }

    #[test]
    fn update_validation_rejects_blank_title_and_zero_attempts() {
        let update: QuizUpdate =
            serde_json::from_value(json!({"title": "", "howManyAttempts": 0})).expect("update");
        assert!(update.validate().is_err());

        let title_only: QuizUpdate =
            serde_json::from_value(json!({"title": "Midterm"})).expect("update");
        assert!(title_only.validate().is_ok());
    }
}

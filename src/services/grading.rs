use crate::db::models::{AttemptAnswer, Question, QuestionKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Grade {
    pub(crate) is_correct: bool,
    pub(crate) points_earned: f64,
}

/// Binary grading, no partial credit.
pub(crate) fn grade(question: &Question, submitted: &str) -> Grade {
    let is_correct = match &question.kind {
        QuestionKind::MultipleChoice { correct_answers, .. } => {
            correct_answers.iter().any(|correct| correct == submitted)
        }
        QuestionKind::TrueFalse { answer } => submitted == true_false_label(*answer),
        QuestionKind::FillInBlank { answers } => {
            let needle = normalize_blank(submitted);
            answers.iter().any(|accepted| normalize_blank(accepted) == needle)
        }
    };

    Grade { is_correct, points_earned: if is_correct { question.points } else { 0.0 } }
}

pub(crate) fn true_false_label(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn normalize_blank(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedAttempt {
    pub(crate) answers: Vec<AttemptAnswer>,
    pub(crate) score: f64,
}

/// Grades every question in quiz order against the first entry of its
/// submitted answer list. Unanswered questions score zero and still get an
/// entry so the breakdown covers the whole quiz.
pub(crate) fn grade_attempt(questions: &[Question], submitted: &[AttemptAnswer]) -> GradedAttempt {
    let mut score = 0.0;
    let answers = questions
        .iter()
        .map(|question| {
            let answer = submitted
                .iter()
                .find(|entry| entry.question_id == question.id)
                .map(|entry| entry.answer.clone())
                .unwrap_or_default();
            let result = match answer.first() {
                Some(first) => grade(question, first),
                None => Grade { is_correct: false, points_earned: 0.0 },
            };
            score += result.points_earned;
            AttemptAnswer {
                question_id: question.id.clone(),
                answer,
                is_correct: Some(result.is_correct),
                points_earned: Some(result.points_earned),
            }
        })
        .collect();

    GradedAttempt { answers, score }
}

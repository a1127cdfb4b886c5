use time::{Duration, OffsetDateTime};

use crate::db::models::Quiz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability {
    Open,
    NotYetOpen,
    Closed,
}

pub(crate) fn availability(quiz: &Quiz, now: OffsetDateTime) -> Availability {
    if quiz.available_date.is_some_and(|available| now < available) {
        return Availability::NotYetOpen;
    }
    if quiz.until_date.is_some_and(|until| now > until) {
        return Availability::Closed;
    }
    Availability::Open
}

/// Deadline stamped on a new attempt: the earlier of `started_at + timeLimit`
/// and the quiz's `untilDate`. Previews only honor the time limit.
pub(crate) fn compute_expires_at(
    quiz: &Quiz,
    started_at: OffsetDateTime,
    preview: bool,
) -> Option<OffsetDateTime> {
    let by_limit = quiz
        .time_limit
        .filter(|minutes| *minutes > 0)
        .map(|minutes| started_at + Duration::minutes(i64::from(minutes)));
    let by_window = if preview { None } else { quiz.until_date };

    match (by_limit, by_window) {
        (Some(limit), Some(until)) => Some(limit.min(until)),
        (limit, until) => limit.or(until),
    }
}

/// Last instant a submission with new answers is accepted.
pub(crate) fn submit_deadline(
    expires_at: Option<OffsetDateTime>,
    grace_seconds: u64,
) -> Option<OffsetDateTime> {
    let grace = Duration::seconds(i64::try_from(grace_seconds).unwrap_or(i64::MAX / 2));
    expires_at.map(|deadline| deadline.saturating_add(grace))
}

pub(crate) fn is_past_deadline(
    expires_at: Option<OffsetDateTime>,
    grace_seconds: u64,
    now: OffsetDateTime,
) -> bool {
    submit_deadline(expires_at, grace_seconds).is_some_and(|deadline| now > deadline)
}

pub(crate) fn seconds_remaining(expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> Option<i64> {
    expires_at.map(|deadline| (deadline - now).whole_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;
    use time::macros::datetime;

    use super::*;
    use crate::db::types::{AssignmentGroup, QuizType};

    fn quiz(time_limit: Option<i32>, until: Option<OffsetDateTime>) -> Quiz {
        let now = datetime!(2025-03-01 09:00 UTC);
        Quiz {
            id: "quiz".into(),
            course_id: "course".into(),
            title: "Q".into(),
            description: String::new(),
            quiz_type: QuizType::GradedQuiz,
            points: 0.0,
            assignment_group: AssignmentGroup::Quizzes,
            shuffle_answers: true,
            time_limit,
            multiple_attempts: false,
            how_many_attempts: 1,
            show_correct_answers: false,
            access_code: None,
            one_question_at_a_time: true,
            webcam_required: false,
            lock_questions_after_answering: false,
            published: true,
            due_date: None,
            available_date: Some(datetime!(2025-03-01 08:00 UTC)),
            until_date: until,
            questions: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expires_at_is_min_of_limit_and_window() {
        let start = datetime!(2025-03-01 10:00 UTC);
        let q = quiz(Some(20), Some(datetime!(2025-03-01 10:05 UTC)));
        assert_eq!(compute_expires_at(&q, start, false), Some(datetime!(2025-03-01 10:05 UTC)));

        let q = quiz(Some(20), Some(datetime!(2025-03-01 12:00 UTC)));
        assert_eq!(compute_expires_at(&q, start, false), Some(datetime!(2025-03-01 10:20 UTC)));
    }

    #[test]
    fn preview_ignores_window() {
        let start = datetime!(2025-03-05 10:00 UTC);
        let q = quiz(None, Some(datetime!(2025-03-01 12:00 UTC)));
        assert_eq!(compute_expires_at(&q, start, true), None);
    }

    #[test]
    fn availability_window_bounds() {
        let q = quiz(None, Some(datetime!(2025-03-02 08:00 UTC)));
        assert_eq!(availability(&q, datetime!(2025-03-01 07:59 UTC)), Availability::NotYetOpen);
        assert_eq!(availability(&q, datetime!(2025-03-01 08:00 UTC)), Availability::Open);
        assert_eq!(availability(&q, datetime!(2025-03-02 08:00 UTC)), Availability::Open);
        assert_eq!(availability(&q, datetime!(2025-03-02 08:01 UTC)), Availability::Closed);
    }

    #[test]
    fn grace_extends_deadline() {
        let expires = Some(datetime!(2025-03-01 10:20 UTC));
        assert!(!is_past_deadline(expires, 60, datetime!(2025-03-01 10:21 UTC)));
        assert!(is_past_deadline(expires, 60, datetime!(2025-03-01 10:21:01 UTC)));
        assert!(!is_past_deadline(None, 0, datetime!(2099-01-01 00:00 UTC)));
    }

    #[test]
    fn remaining_never_negative() {
        let expires = Some(datetime!(2025-03-01 10:20 UTC));
        assert_eq!(seconds_remaining(expires, datetime!(2025-03-01 10:19 UTC)), Some(60));
        assert_eq!(seconds_remaining(expires, datetime!(2025-03-01 10:30 UTC)), Some(0));
    }
}

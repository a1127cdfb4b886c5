use serde_json::json;
use time::macros::datetime;
use time::OffsetDateTime;

use super::*;
use crate::db::models::QuestionKind;
use crate::test_support;

fn create_payload(value: serde_json::Value) -> QuizCreate {
    serde_json::from_value(value).expect("create payload")
}

fn update_payload(value: serde_json::Value) -> QuizUpdate {
    serde_json::from_value(value).expect("update payload")
}

fn question_payload(value: serde_json::Value) -> QuestionPayload {
    serde_json::from_value(value).expect("question payload")
}

#[tokio::test]
async fn create_applies_defaults() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;

    let quiz = create_quiz(&ctx.state, &course.id, QuizCreate::default(), OffsetDateTime::now_utc())
        .await
        .expect("create");

    assert_eq!(quiz.title, DEFAULT_QUIZ_TITLE);
    assert!(!quiz.published);
    assert!(quiz.questions.0.is_empty());
    assert_eq!(quiz.quiz_type, QuizType::GradedQuiz);
    assert_eq!(quiz.assignment_group, AssignmentGroup::Quizzes);
    assert!(quiz.shuffle_answers);
    assert_eq!(quiz.time_limit, Some(20));
    assert!(!quiz.multiple_attempts);
    assert_eq!(quiz.how_many_attempts, 1);
    assert!(!quiz.show_correct_answers);
    assert!(quiz.one_question_at_a_time);
    assert!(!quiz.webcam_required);
    assert!(!quiz.lock_questions_after_answering);
    assert_eq!(quiz.points, 0.0);
}

#[tokio::test]
async fn create_rejects_unknown_course() {
    let ctx = test_support::setup_test_context().await;

    let err = create_quiz(&ctx.state, "missing", QuizCreate::default(), OffsetDateTime::now_utc())
        .await
        .expect_err("no course");
    assert!(matches!(err, QuizError::CourseNotFound(_)));
}

#[tokio::test]
async fn explicit_null_time_limit_means_untimed() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;

    let quiz = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"timeLimit": null})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("create");
    assert_eq!(quiz.time_limit, None);
}

#[tokio::test]
async fn update_then_get_round_trips_and_null_clears() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let quiz = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"title": "Week 1", "accessCode": "abc", "dueDate": "2026-03-01T10:00:00Z"})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("create");

    let updated = update_quiz(
        &ctx.state,
        &quiz.id,
        update_payload(json!({
            "description": "<p>Read chapter 1</p>",
            "multipleAttempts": true,
            "howManyAttempts": 3,
            "accessCode": null,
            "dueDate": null
        })),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("update");

    let fetched = get_quiz(&ctx.state, &quiz.id).await.expect("get");
    assert_eq!(fetched.title, "Week 1");
    assert_eq!(fetched.description, "<p>Read chapter 1</p>");
    assert!(fetched.multiple_attempts);
    assert_eq!(fetched.how_many_attempts, 3);
    assert_eq!(fetched.access_code, None);
    assert_eq!(fetched.due_date, None);
    assert_eq!(fetched.updated_at, updated.updated_at);
}

#[tokio::test]
async fn replacing_questions_keeps_ids_and_recomputes_points() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let quiz = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"questions": [
            {"_id": "q1", "type": "TRUE_FALSE", "points": 2, "correctAnswers": ["False"]},
            {"type": "FILL_IN_BLANK", "points": 3, "correctAnswers": ["four"]}
        ]})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("create");
    assert_eq!(quiz.points, 5.0);
    assert_eq!(quiz.questions.0[0].id, "q1");
    assert!(!quiz.questions.0[1].id.is_empty());

    let updated = update_quiz(
        &ctx.state,
        &quiz.id,
        update_payload(json!({"questions": [
            {"_id": "q1", "type": "MULTIPLE_CHOICE", "points": 7,
             "choices": ["x", "y"], "correctAnswers": ["y"]}
        ]})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("update");

    assert_eq!(updated.questions.0.len(), 1);
    assert_eq!(updated.questions.0[0].id, "q1");
    assert_eq!(updated.points, 7.0);
}

#[tokio::test]
async fn duplicate_question_ids_get_fresh_ones() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let quiz = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"questions": [
            {"_id": "dup", "type": "TRUE_FALSE", "points": 1, "correctAnswers": ["True"]},
            {"_id": "dup", "type": "TRUE_FALSE", "points": 1, "correctAnswers": ["True"]}
        ]})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("create");

    assert_eq!(quiz.questions.0[0].id, "dup");
    assert_ne!(quiz.questions.0[1].id, "dup");
}

#[tokio::test]
async fn invalid_quiz_fields_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;

    let err = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"timeLimit": 0})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect_err("zero time limit");
    assert!(matches!(err, QuizError::Validation(_)));

    let err = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({
            "availableDate": "2026-03-02T00:00:00Z",
            "untilDate": "2026-03-01T00:00:00Z"
        })),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect_err("until before available");
    assert!(matches!(err, QuizError::Validation(_)));

    let err = create_quiz(
        &ctx.state,
        &course.id,
        create_payload(json!({"questions": [
            {"type": "MULTIPLE_CHOICE", "points": 1, "choices": ["a", "b"], "correctAnswers": ["c"]}
        ]})),
        OffsetDateTime::now_utc(),
    )
    .await
    .expect_err("stray correct answer");
    match err {
        QuizError::Validation(message) => assert!(message.starts_with("question 1:")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn question_crud_keeps_points_in_sync() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let now = datetime!(2026-02-01 12:00 UTC);
    let quiz = create_quiz(&ctx.state, &course.id, QuizCreate::default(), now).await.expect("create");

    let quiz = add_question(
        &ctx.state,
        &quiz.id,
        question_payload(json!({"title": "Q", "type": "MULTIPLE_CHOICE", "points": 4,
            "choices": ["a", "b", "c"], "correctAnswers": ["b"]})),
        now,
    )
    .await
    .expect("add");
    assert_eq!(quiz.points, 4.0);
    let question_id = quiz.questions.0[0].id.clone();

    // Switching type drops the choices.
    let quiz = update_question(
        &ctx.state,
        &quiz.id,
        &question_id,
        question_payload(json!({"title": "Q", "type": "FILL_IN_BLANK", "points": 6,
            "choices": ["ignored"], "correctAnswers": [" Answer "]})),
        now,
    )
    .await
    .expect("update");
    assert_eq!(quiz.points, 6.0);
    assert_eq!(quiz.questions.0[0].id, question_id);
    assert_eq!(
        quiz.questions.0[0].kind,
        QuestionKind::FillInBlank { answers: vec!["Answer".to_string()] }
    );

    let quiz = delete_question(&ctx.state, &quiz.id, &question_id, now).await.expect("delete");
    assert!(quiz.questions.0.is_empty());
    assert_eq!(quiz.points, 0.0);

    let err = delete_question(&ctx.state, &quiz.id, &question_id, now)
        .await
        .expect_err("already gone");
    assert!(matches!(err, QuizError::QuestionNotFound(_)));
}

// Builder sets the multiple-choice question to 5 points, then retypes it
// to true/false worth 2; the quiz ends at 2 points with the original id.
#[tokio::test]
async fn builder_retype_scenario() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let now = OffsetDateTime::now_utc();
    let quiz = create_quiz(&ctx.state, &course.id, QuizCreate::default(), now).await.expect("create");
    let quiz = add_question(
        &ctx.state,
        &quiz.id,
        question_payload(json!({"type": "MULTIPLE_CHOICE", "points": 5,
            "choices": ["a", "b"], "correctAnswers": ["a"]})),
        now,
    )
    .await
    .expect("add");
    let question_id = quiz.questions.0[0].id.clone();

    let quiz = update_question(
        &ctx.state,
        &quiz.id,
        &question_id,
        question_payload(json!({"type": "TRUE_FALSE", "points": 2,
            "choices": ["a", "b"], "correctAnswers": ["False"]})),
        now,
    )
    .await
    .expect("retype");

    assert_eq!(quiz.points, 2.0);
    assert_eq!(quiz.questions.0[0].kind, QuestionKind::TrueFalse { answer: false });
}

#[tokio::test]
async fn concurrent_updates_are_not_lost() {
    let ctx = test_support::setup_test_context().await;
    let course = test_support::insert_course(&ctx.state, "CS1", "Intro").await;
    let now = OffsetDateTime::now_utc();
    let quiz = create_quiz(&ctx.state, &course.id, QuizCreate::default(), now).await.expect("create");

    let mut handles = Vec::new();
    for index in 0..8 {
        let state = ctx.state.clone();
        let quiz_id = quiz.id.clone();
        handles.push(tokio::spawn(async move {
            let payload = question_payload(json!({
                "title": format!("Q{index}"), "type": "TRUE_FALSE", "points": 1,
                "correctAnswers": ["True"]
            }));
            add_question(&state, &quiz_id, payload, OffsetDateTime::now_utc()).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("add");
    }

    let quiz = get_quiz(&ctx.state, &quiz.id).await.expect("get");
    assert_eq!(quiz.questions.0.len(), 8);
    assert_eq!(quiz.points, 8.0);
}

#[tokio::test]
async fn delete_cascades_attempts_and_lists_filter_unpublished() {
    let ctx = test_support::setup_test_context().await;
    let (course, _faculty, student) = test_support::course_with_members(&ctx.state).await;
    let published = test_support::published_quiz(&ctx.state, &course, json!({})).await;
    let draft = create_quiz(&ctx.state, &course.id, QuizCreate::default(), OffsetDateTime::now_utc())
        .await
        .expect("draft");

    let visible = list_quizzes(&ctx.state, &course.id, false).await.expect("list");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, published.id);
    assert_eq!(list_quizzes(&ctx.state, &course.id, true).await.expect("list").len(), 2);

    crate::services::attempts::start_attempt(
        &ctx.state,
        &published.id,
        &student,
        None,
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("start");

    delete_quiz(&ctx.state, &published.id).await.expect("delete");
    assert!(ctx.state.store().list_attempts(&published.id, None).await.expect("attempts").is_empty());
    assert!(matches!(
        get_quiz(&ctx.state, &published.id).await,
        Err(QuizError::QuizNotFound(_))
    ));
    assert!(get_quiz(&ctx.state, &draft.id).await.is_ok());
}

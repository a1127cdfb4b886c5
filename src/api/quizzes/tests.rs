use axum::http::{Method, StatusCode};
use serde_json::json;
use time::OffsetDateTime;
use tower::ServiceExt;

use crate::services::attempts::{self, AnswerInput};
use crate::test_support;

#[tokio::test]
async fn faculty_create_with_defaults_and_edit_questions() {
    let ctx = test_support::setup_test_context().await;
    let (course, faculty, _student) = test_support::course_with_members(&ctx.state).await;
    let token = test_support::session_token(&ctx.state, &faculty).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{}/quizzes", course.id),
            Some(&token),
            Some(json!({})),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz = test_support::read_json(response).await;
    assert_eq!(quiz["title"], "Unnamed Quiz");
    assert_eq!(quiz["quizType"], "GRADED_QUIZ");
    assert_eq!(quiz["assignmentGroup"], "QUIZZES");
    assert_eq!(quiz["timeLimit"], 20);
    assert_eq!(quiz["howManyAttempts"], 1);
    assert_eq!(quiz["shuffleAnswers"], true);
    assert_eq!(quiz["oneQuestionAtATime"], true);
    assert_eq!(quiz["published"], false);
    assert_eq!(quiz["points"], 0.0);
    let quiz_id = quiz["_id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/quizzes/{quiz_id}/questions"),
            Some(&token),
            Some(json!({
                "title": "Q1", "type": "MULTIPLE_CHOICE", "points": 3, "question": "2+2?",
                "choices": ["3", "4"], "correctAnswers": ["4"]
            })),
        ))
        .await
        .expect("add question");
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz = test_support::read_json(response).await;
    assert_eq!(quiz["points"], 3.0);
    let question_id = quiz["questions"][0]["_id"].as_str().expect("question id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/quizzes/{quiz_id}/questions/{question_id}"),
            Some(&token),
            Some(json!({
                "title": "Q1", "type": "TRUE_FALSE", "points": 7, "question": "4 is even",
                "correctAnswers": ["True"]
            })),
        ))
        .await
        .expect("update question");
    assert_eq!(response.status(), StatusCode::OK);
    let quiz = test_support::read_json(response).await;
    assert_eq!(quiz["points"], 7.0);
    assert_eq!(quiz["questions"][0]["type"], "TRUE_FALSE");
    assert_eq!(quiz["questions"][0]["_id"], question_id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/quizzes/{quiz_id}"),
            Some(&token),
            Some(json!({"title": "Week 1 Check", "timeLimit": null, "published": true})),
        ))
        .await
        .expect("update quiz");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes/{quiz_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get quiz");
    let quiz = test_support::read_json(response).await;
    assert_eq!(quiz["title"], "Week 1 Check");
    assert!(quiz["timeLimit"].is_null());
    assert_eq!(quiz["published"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/quizzes/{quiz_id}/questions/{question_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete question");
    assert_eq!(response.status(), StatusCode::OK);
    let quiz = test_support::read_json(response).await;
    assert_eq!(quiz["points"], 0.0);
    assert!(quiz["questions"].as_array().expect("questions").is_empty());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/quizzes/{quiz_id}/questions/{question_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete missing question");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_questions_are_validation_errors() {
    let ctx = test_support::setup_test_context().await;
    let (course, faculty, _student) = test_support::course_with_members(&ctx.state).await;
    let quiz = test_support::published_quiz(&ctx.state, &course, json!({})).await;
    let token = test_support::session_token(&ctx.state, &faculty).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/quizzes/{}/questions", quiz.id),
            Some(&token),
            Some(json!({
                "type": "MULTIPLE_CHOICE", "points": 2, "choices": ["A", "B"],
                "correctAnswers": ["Z"]
            })),
        ))
        .await
        .expect("add question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn students_never_see_unpublished_quizzes_or_answer_keys() {
    let ctx = test_support::setup_test_context().await;
    let (course, _faculty, student) = test_support::course_with_members(&ctx.state).await;
    let published =
        test_support::published_quiz(&ctx.state, &course, json!({"accessCode": "open-sesame"}))
            .await;
    let draft =
        test_support::published_quiz(&ctx.state, &course, json!({"title": "Draft", "published": false}))
            .await;
    let token = test_support::session_token(&ctx.state, &student).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/courses/{}/quizzes", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let list = test_support::read_json(response).await;
    let list = list.as_array().expect("array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["_id"], published.id.as_str());
    assert_eq!(list[0]["requiresAccessCode"], true);
    assert!(list[0]["accessCode"].is_null());
    for question in list[0]["questions"].as_array().expect("questions") {
        assert!(question["correctAnswers"].as_array().expect("answers").is_empty());
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes/{}", draft.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get draft");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/quizzes/{}", published.id),
            Some(&token),
            Some(json!({"points": 1000, "title": "Mine now"})),
        ))
        .await
        .expect("student update");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn answer_keys_unlock_after_a_completed_attempt() {
    let ctx = test_support::setup_test_context().await;
    let (course, _faculty, student) = test_support::course_with_members(&ctx.state).await;
    let quiz =
        test_support::published_quiz(&ctx.state, &course, json!({"showCorrectAnswers": true})).await;
    let token = test_support::session_token(&ctx.state, &student).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get before");
    let before = test_support::read_json(response).await;
    assert!(before["questions"][0]["correctAnswers"].as_array().expect("answers").is_empty());

    let now = OffsetDateTime::now_utc();
    let started =
        attempts::start_attempt(&ctx.state, &quiz.id, &student, None, now).await.expect("start");
    let answers =
        vec![AnswerInput { question_id: quiz.questions.0[0].id.clone(), answer: vec!["True".into()] }];
    attempts::submit_attempt(&ctx.state, &quiz.id, &started.attempt.id, &student, Some(answers), now)
        .await
        .expect("submit");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get after");
    let after = test_support::read_json(response).await;
    assert_eq!(after["questions"][0]["correctAnswers"], json!(["True"]));
    assert!(after["accessCode"].is_null());
}

#[tokio::test]
async fn outsiders_cannot_list_course_quizzes() {
    let ctx = test_support::setup_test_context().await;
    let (course, _faculty, _student) = test_support::course_with_members(&ctx.state).await;
    let outsider = test_support::insert_user(
        &ctx.state,
        "drifter",
        crate::db::types::UserRole::Student,
        test_support::TEST_PASSWORD,
    )
    .await;
    let token = test_support::session_token(&ctx.state, &outsider).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/courses/{}/quizzes", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_quiz_removes_it() {
    let ctx = test_support::setup_test_context().await;
    let (course, faculty, _student) = test_support::course_with_members(&ctx.state).await;
    let quiz = test_support::published_quiz(&ctx.state, &course, json!({})).await;
    let token = test_support::session_token(&ctx.state, &faculty).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = test_support::read_json(response).await;
    assert_eq!(body["kind"], "not_found");
}

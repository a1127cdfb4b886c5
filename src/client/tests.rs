use time::OffsetDateTime;

use super::models::{NewQuiz, Question, QuestionType, SignupForm};
use super::state::{
    Countdown, DetailsEdit, NoticeLevel, QuestionEdit, QuizEditorState, QuizListState,
    TakeQuizState,
};
use super::KambazClient;
use crate::db::types::UserRole;
use crate::test_support;

/// Serves the router on an ephemeral port and returns its origin.
async fn spawn_server(ctx: &test_support::TestContext) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = ctx.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn author_and_take_a_quiz_through_the_client() {
    let ctx = test_support::setup_test_context().await;
    let faculty =
        test_support::insert_user(&ctx.state, "prof", UserRole::Faculty, test_support::TEST_PASSWORD)
            .await;
    let course = test_support::insert_course(&ctx.state, "RS101", "Rust Systems").await;
    test_support::enroll(&ctx.state, &faculty, &course).await;
    let origin = spawn_server(&ctx).await;

    let author = KambazClient::new(&origin).expect("client");
    let me = author.signin("prof", test_support::TEST_PASSWORD).await.expect("signin");
    assert!(me.role.can_author());

    let list = QuizListState::new(course.id.clone());
    let (list, pending) = list.create_pending("Ownership");
    let created = author
        .create_quiz(&course.id, &NewQuiz { title: Some("Ownership".into()), ..NewQuiz::default() })
        .await
        .expect("create quiz");
    let list = list.created(&pending, created.clone());
    assert_eq!(list.quizzes[0].id, created.id);

    let mut tf = Question::blank(QuestionType::TrueFalse);
    tf.title = "Moves".into();
    tf.prompt = "A moved String can still be read".into();
    tf.points = 5.0;
    let with_question = author.add_question(&created.id, &tf).await.expect("add question");

    let editor = QuizEditorState::open(with_question)
        .edit_question(0, QuestionEdit::Truth(false))
        .add_question()
        .edit_question(1, QuestionEdit::Type(QuestionType::FillInBlank))
        .edit_question(1, QuestionEdit::Prompt("Keyword for a shared borrow".into()))
        .edit_question(1, QuestionEdit::BlankAnswers(vec!["&".into()]))
        .edit_question(1, QuestionEdit::Points(10.0))
        .edit_details(DetailsEdit::TimeLimit(Some(30)))
        .edit_details(DetailsEdit::Published(true));
    assert_eq!(editor.draft.points, 15.0);
    let saved = author.save_quiz(&editor.draft).await.expect("save quiz");
    let editor = editor.saved(saved);
    assert!(!editor.is_dirty());
    assert_eq!(editor.saved.points, 15.0);
    assert_eq!(editor.saved.time_limit, Some(30));
    let quiz_id = editor.saved.id.clone();

    let learner = KambazClient::new(&origin).expect("client");
    learner
        .signup(&SignupForm {
            username: "learner".into(),
            password: "borrowck-fan".into(),
            first_name: "Lee".into(),
            ..SignupForm::default()
        })
        .await
        .expect("signup");
    learner.enroll(&course.id).await.expect("enroll");
    assert_eq!(learner.my_courses().await.expect("courses").len(), 1);

    let student_view = learner.quiz(&quiz_id).await.expect("quiz");
    assert!(student_view.questions.iter().all(|question| question.correct_answers.is_empty()));
    assert!(learner.latest_attempt(&quiz_id).await.expect("latest").is_none());

    let attempt = learner.start_attempt(&quiz_id, None).await.expect("start");
    let now = OffsetDateTime::now_utc();
    let take = TakeQuizState::begin(student_view, attempt, now);
    assert!(matches!(take.countdown(now), Countdown::Running { .. }));

    let ids: Vec<String> =
        take.quiz.questions.iter().filter_map(|question| question.id.clone()).collect();
    let take = take.answer(&ids[0], "False").next().answer(&ids[1], " & ");
    let drafted = learner
        .save_draft(&quiz_id, &take.attempt.id, &take.payload())
        .await
        .expect("draft");
    let take = take.synced(drafted);

    let submitted = learner
        .submit_attempt(&quiz_id, &take.attempt.id, None)
        .await
        .expect("submit");
    let take = take.synced(submitted);
    assert!(take.is_submitted());
    assert_eq!(take.attempt.score, Some(15.0));
    assert_eq!(take.countdown(OffsetDateTime::now_utc()), Countdown::Untimed);

    let err = learner
        .submit_attempt(&quiz_id, &take.attempt.id, Some(&take.payload()))
        .await
        .expect_err("second submit");
    assert_eq!(err.kind(), "already_completed");
    assert_eq!(err.status(), Some(409));
    let take = take.failed(&err);
    assert_eq!(take.notice.as_ref().map(|notice| notice.level), Some(NoticeLevel::Error));
    assert_eq!(take.attempt.score, Some(15.0));

    let err = learner.start_attempt(&quiz_id, None).await.expect_err("cap");
    assert_eq!(err.kind(), "attempt_limit_exceeded");

    let err = learner.delete_quiz(&quiz_id).await.expect_err("student delete");
    assert_eq!(err.kind(), "forbidden");

    learner.signout().await.expect("signout");
    let err = learner.profile().await.expect_err("signed out");
    assert_eq!(err.kind(), "unauthorized");
}

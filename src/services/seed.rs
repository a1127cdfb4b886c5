use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use sqlx::types::Json;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::core::{security, state::AppState};
use crate::db::models::{Assignment, Course, CourseModule, Enrollment, Lesson, User};
use crate::db::types::UserRole;
use crate::schemas::fields::{optional_date, optional_number, optional_timestamp};
use crate::schemas::quiz::QuizCreate;
use crate::services::quizzes;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedData {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    courses: Vec<SeedCourse>,
    #[serde(default)]
    enrollments: Vec<SeedEnrollment>,
    #[serde(default)]
    modules: Vec<SeedModule>,
    #[serde(default)]
    assignments: Vec<SeedAssignment>,
    #[serde(default)]
    quizzes: Vec<SeedQuiz>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    section: Option<String>,
    role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedCourse {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    credits: Option<i32>,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "optional_date")]
    start_date: Option<Date>,
    #[serde(default, deserialize_with = "optional_date")]
    end_date: Option<Date>,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedEnrollment {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    user: String,
    course: String,
}

#[derive(Debug, Deserialize)]
struct SeedModule {
    #[serde(rename = "_id")]
    id: String,
    course: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    lessons: Vec<SeedLesson>,
}

#[derive(Debug, Deserialize)]
struct SeedLesson {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedAssignment {
    #[serde(rename = "_id")]
    id: String,
    course: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "optional_number")]
    points: Option<f64>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    due_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    available_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    until_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct SeedQuiz {
    course: String,
    #[serde(flatten)]
    quiz: QuizCreate,
}

pub(crate) fn read_seed(path: &Path) -> anyhow::Result<SeedData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid seed file {}", path.display()))
}

/// Loads the dataset into an empty store. A store that already has users is
/// left alone so restarts against Postgres do not duplicate rows.
pub(crate) async fn load_seed(state: &AppState, data: SeedData) -> anyhow::Result<bool> {
    if state.store().count_users().await? > 0 {
        tracing::info!("Store already populated; skipping seed data");
        return Ok(false);
    }

    let now = OffsetDateTime::now_utc();
    let memory_kib = state.settings().security().password_hash_memory_kib;

    for user in data.users {
        let hashed_password = security::hash_password(&user.password, memory_kib)
            .with_context(|| format!("failed to hash seed password for {}", user.username))?;
        state
            .store()
            .create_user(User {
                id: user.id,
                username: user.username,
                hashed_password,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
                section: user.section,
                role: user.role,
                last_activity: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    for course in data.courses {
        state
            .store()
            .create_course(Course {
                id: course.id,
                name: course.name,
                number: course.number,
                department: course.department,
                credits: course.credits,
                description: course.description,
                start_date: course.start_date,
                end_date: course.end_date,
                author: course.author,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    for enrollment in data.enrollments {
        state
            .store()
            .enroll(Enrollment {
                id: enrollment.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                user_id: enrollment.user,
                course_id: enrollment.course,
                created_at: now,
            })
            .await?;
    }

    for module in data.modules {
        let lessons = module
            .lessons
            .into_iter()
            .map(|lesson| Lesson { id: lesson.id, name: lesson.name, description: lesson.description })
            .collect();
        state
            .store()
            .create_module(CourseModule {
                id: module.id,
                course_id: module.course,
                name: module.name,
                description: module.description,
                lessons: Json(lessons),
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    for assignment in data.assignments {
        state
            .store()
            .create_assignment(Assignment {
                id: assignment.id,
                course_id: assignment.course,
                title: assignment.title,
                description: assignment.description,
                points: assignment.points.unwrap_or(100.0),
                due_date: assignment.due_date,
                available_date: assignment.available_date,
                until_date: assignment.until_date,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    for seed in data.quizzes {
        quizzes::create_quiz(state, &seed.course, seed.quiz, now)
            .await
            .with_context(|| format!("failed to seed quiz for course {}", seed.course))?;
    }

    tracing::info!("Seed data loaded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn bundled_seed_parses_and_loads() {
        let ctx = test_support::setup_test_context().await;
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("seed/kambaz.json");
        let data = read_seed(&path).expect("seed parses");

        assert!(load_seed(&ctx.state, data).await.expect("seed loads"));

        let store = ctx.state.store();
        assert!(store.count_users().await.expect("count") > 0);
        let courses = store.list_courses().await.expect("courses");
        assert!(!courses.is_empty());
        let mut quiz_count = 0;
        for course in &courses {
            for quiz in store.list_quizzes(&course.id).await.expect("quizzes") {
                assert_eq!(quiz.points, quiz.question_points());
                quiz_count += 1;
            }
        }
        assert!(quiz_count > 0);
    }

    #[tokio::test]
    async fn seed_is_skipped_when_users_exist() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(&ctx.state, "existing", UserRole::Student, "password1").await;

        assert!(!load_seed(&ctx.state, SeedData::default()).await.expect("seed"));
    }
}

use sqlx::Row;

/// Only an explicit `DATABASE_URL` enables these tests; without one they
/// pass without touching a database.
fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();

    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

async fn migrated_pool(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(database_url).await?;

    let migrations_dir =
        std::env::var("KAMBAZ_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;
    Ok(pool)
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping migrations smoke test");
        return Ok(());
    };
    let pool = migrated_pool(&database_url).await?;

    let tables = [
        "users",
        "sessions",
        "courses",
        "enrollments",
        "course_modules",
        "assignments",
        "quizzes",
        "quiz_attempts",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    Ok(())
}

#[tokio::test]
async fn deleting_a_course_cascades_to_attempts() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping cascade smoke test");
        return Ok(());
    };
    let pool = migrated_pool(&database_url).await?;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let user_id = format!("smoke-user-{suffix}");
    let course_id = format!("smoke-course-{suffix}");
    let quiz_id = format!("smoke-quiz-{suffix}");
    let attempt_id = format!("smoke-attempt-{suffix}");

    sqlx::query(
        "INSERT INTO users (id, username, hashed_password, first_name, last_name, role, created_at, updated_at)
         VALUES ($1, $1, 'x', 'Smoke', 'Test', 'student', now(), now())",
    )
    .bind(&user_id)
    .execute(&pool)
    .await?;
    sqlx::query(
        "INSERT INTO courses (id, name, number, description, created_at, updated_at)
         VALUES ($1, 'Smoke', 'SM000', '', now(), now())",
    )
    .bind(&course_id)
    .execute(&pool)
    .await?;
    sqlx::query(
        "INSERT INTO quizzes (id, course_id, title, description, quiz_type, points, assignment_group,
             shuffle_answers, time_limit, multiple_attempts, how_many_attempts, show_correct_answers,
             one_question_at_a_time, webcam_required, lock_questions_after_answering, published,
             questions, created_at, updated_at)
         VALUES ($1, $2, 'Smoke quiz', '', 'graded_quiz', 0, 'quizzes', true, 20, false, 1, false,
             true, false, false, true, '[]'::jsonb, now(), now())",
    )
    .bind(&quiz_id)
    .bind(&course_id)
    .execute(&pool)
    .await?;
    sqlx::query(
        "INSERT INTO quiz_attempts (id, quiz_id, user_id, attempt_number, status, total_points,
             started_at, updated_at)
         VALUES ($1, $2, $3, 1, 'in_progress', 0, now(), now())",
    )
    .bind(&attempt_id)
    .bind(&quiz_id)
    .bind(&user_id)
    .execute(&pool)
    .await?;

    sqlx::query("DELETE FROM courses WHERE id = $1").bind(&course_id).execute(&pool).await?;

    let remaining: i64 = sqlx::query_scalar("SELECT count(*) FROM quiz_attempts WHERE id = $1")
        .bind(&attempt_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(remaining, 0);

    sqlx::query("DELETE FROM users WHERE id = $1").bind(&user_id).execute(&pool).await?;
    Ok(())
}

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::{
    Assignment, Course, CourseModule, Enrollment, Quiz, QuizAttempt, Session, User,
};
use crate::repositories::{
    AssignmentRepository, AttemptRepository, CourseRepository, EnrollmentRepository,
    ModuleRepository, QuizRepository, RepoError, RepoResult, SessionRepository, Store,
    UserFilter, UserRepository,
};

const USER_COLUMNS: &str = "\
    id, username, hashed_password, first_name, last_name, email, section, role, \
    last_activity, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, created_at, expires_at";

const COURSE_COLUMNS: &str = "\
    id, name, number, department, credits, description, start_date, end_date, author, \
    created_at, updated_at";

const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, created_at";

const MODULE_COLUMNS: &str = "id, course_id, name, description, lessons, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "\
    id, course_id, title, description, points, due_date, available_date, until_date, \
    created_at, updated_at";

const QUIZ_COLUMNS: &str = "\
    id, course_id, title, description, quiz_type, points, assignment_group, shuffle_answers, \
    time_limit, multiple_attempts, how_many_attempts, show_correct_answers, access_code, \
    one_question_at_a_time, webcam_required, lock_questions_after_answering, published, \
    due_date, available_date, until_date, questions, created_at, updated_at";

const ATTEMPT_COLUMNS: &str = "\
    id, quiz_id, user_id, attempt_number, status, answers, score, total_points, started_at, \
    expires_at, submitted_at, updated_at";

/// Postgres-backed store. Cascades are declared in the schema.
#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> RepoError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepoError::Conflict(message())
        }
        _ => RepoError::Database(err),
    }
}

fn ensure_found(rows: u64, entity: &'static str, id: &str) -> RepoResult<()> {
    if rows == 0 {
        return Err(RepoError::missing(entity, id));
    }
    Ok(())
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: User) -> RepoResult<User> {
        let username = user.username.clone();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (
                id, username, hashed_password, first_name, last_name, email, section, role,
                last_activity, created_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             RETURNING {USER_COLUMNS}",
        ))
        .bind(user.id)
        .bind(user.username)
        .bind(user.hashed_password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.section)
        .bind(user.role)
        .bind(user.last_activity)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_unique(err, || format!("username {username} already taken")))
    }

    async fn find_user(&self, id: &str) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>> {
        let name = filter
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| format!("%{}%", name.to_lowercase()));
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ($1::userrole IS NULL OR role = $1)
               AND ($2::text IS NULL
                    OR lower(first_name) LIKE $2
                    OR lower(last_name) LIKE $2
                    OR lower(username) LIKE $2)
             ORDER BY username"
        ))
        .bind(filter.role)
        .bind(name)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_user(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET
                username = $1, hashed_password = $2, first_name = $3, last_name = $4,
                email = $5, section = $6, role = $7, last_activity = $8, updated_at = $9
             WHERE id = $10",
        )
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.section)
        .bind(user.role)
        .bind(user.last_activity)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_unique(err, || format!("username {} already taken", user.username)))?;
        ensure_found(result.rows_affected(), "user", &user.id)
    }

    async fn delete_user(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn create_session(&self, session: Session) -> RepoResult<Session> {
        Ok(sqlx::query_as::<_, Session>(&format!(
            "INSERT INTO sessions (id, user_id, created_at, expires_at)
             VALUES ($1,$2,$3,$4)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_session(&self, id: &str) -> RepoResult<Option<Session>> {
        Ok(sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_session(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CourseRepository for PgStore {
    async fn create_course(&self, course: Course) -> RepoResult<Course> {
        let id = course.id.clone();
        sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (
                id, name, number, department, credits, description, start_date, end_date,
                author, created_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course.id)
        .bind(course.name)
        .bind(course.number)
        .bind(course.department)
        .bind(course.credits)
        .bind(course.description)
        .bind(course.start_date)
        .bind(course.end_date)
        .bind(course.author)
        .bind(course.created_at)
        .bind(course.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_unique(err, || format!("course {id} already exists")))
    }

    async fn find_course(&self, id: &str) -> RepoResult<Option<Course>> {
        Ok(sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_courses(&self) -> RepoResult<Vec<Course>> {
        Ok(sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY number, name"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_courses_for_user(&self, user_id: &str) -> RepoResult<Vec<Course>> {
        Ok(sqlx::query_as::<_, Course>(
            "SELECT c.id, c.name, c.number, c.department, c.credits, c.description,
                    c.start_date, c.end_date, c.author, c.created_at, c.updated_at
             FROM courses c
             JOIN enrollments e ON e.course_id = c.id
             WHERE e.user_id = $1
             ORDER BY c.number, c.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_course(&self, course: &Course) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE courses SET
                name = $1, number = $2, department = $3, credits = $4, description = $5,
                start_date = $6, end_date = $7, author = $8, updated_at = $9
             WHERE id = $10",
        )
        .bind(&course.name)
        .bind(&course.number)
        .bind(&course.department)
        .bind(course.credits)
        .bind(&course.description)
        .bind(course.start_date)
        .bind(course.end_date)
        .bind(&course.author)
        .bind(course.updated_at)
        .bind(&course.id)
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), "course", &course.id)
    }

    async fn delete_course(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EnrollmentRepository for PgStore {
    async fn enroll(&self, enrollment: Enrollment) -> RepoResult<Enrollment> {
        sqlx::query(
            "INSERT INTO enrollments (id, user_id, course_id, created_at)
             VALUES ($1,$2,$3,$4)
             ON CONFLICT (user_id, course_id) DO NOTHING",
        )
        .bind(&enrollment.id)
        .bind(&enrollment.user_id)
        .bind(&enrollment.course_id)
        .bind(enrollment.created_at)
        .execute(&self.pool)
        .await?;

        self.find_enrollment(&enrollment.user_id, &enrollment.course_id)
            .await?
            .ok_or_else(|| RepoError::missing("enrollment", &enrollment.id))
    }

    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepoResult<Option<Enrollment>> {
        Ok(sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn unenroll(&self, user_id: &str, course_id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_course_members(&self, course_id: &str) -> RepoResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.hashed_password, u.first_name, u.last_name, u.email,
                    u.section, u.role, u.last_activity, u.created_at, u.updated_at
             FROM users u
             JOIN enrollments e ON e.user_id = u.id
             WHERE e.course_id = $1
             ORDER BY u.last_name, u.first_name",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ModuleRepository for PgStore {
    async fn create_module(&self, module: CourseModule) -> RepoResult<CourseModule> {
        Ok(sqlx::query_as::<_, CourseModule>(&format!(
            "INSERT INTO course_modules (
                id, course_id, name, description, lessons, created_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7)
             RETURNING {MODULE_COLUMNS}"
        ))
        .bind(module.id)
        .bind(module.course_id)
        .bind(module.name)
        .bind(module.description)
        .bind(module.lessons)
        .bind(module.created_at)
        .bind(module.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_module(&self, id: &str) -> RepoResult<Option<CourseModule>> {
        Ok(sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {MODULE_COLUMNS} FROM course_modules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_modules(&self, course_id: &str) -> RepoResult<Vec<CourseModule>> {
        Ok(sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {MODULE_COLUMNS} FROM course_modules WHERE course_id = $1 ORDER BY created_at"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_module(&self, module: &CourseModule) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE course_modules SET name = $1, description = $2, lessons = $3, updated_at = $4
             WHERE id = $5",
        )
        .bind(&module.name)
        .bind(&module.description)
        .bind(&module.lessons)
        .bind(module.updated_at)
        .bind(&module.id)
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), "module", &module.id)
    }

    async fn delete_module(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM course_modules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AssignmentRepository for PgStore {
    async fn create_assignment(&self, assignment: Assignment) -> RepoResult<Assignment> {
        Ok(sqlx::query_as::<_, Assignment>(&format!(
            "INSERT INTO assignments (
                id, course_id, title, description, points, due_date, available_date,
                until_date, created_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
             RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(assignment.id)
        .bind(assignment.course_id)
        .bind(assignment.title)
        .bind(assignment.description)
        .bind(assignment.points)
        .bind(assignment.due_date)
        .bind(assignment.available_date)
        .bind(assignment.until_date)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_assignment(&self, id: &str) -> RepoResult<Option<Assignment>> {
        Ok(sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_assignments(&self, course_id: &str) -> RepoResult<Vec<Assignment>> {
        Ok(sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE course_id = $1 ORDER BY created_at"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE assignments SET
                title = $1, description = $2, points = $3, due_date = $4,
                available_date = $5, until_date = $6, updated_at = $7
             WHERE id = $8",
        )
        .bind(&assignment.title)
        .bind(&assignment.description)
        .bind(assignment.points)
        .bind(assignment.due_date)
        .bind(assignment.available_date)
        .bind(assignment.until_date)
        .bind(assignment.updated_at)
        .bind(&assignment.id)
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), "assignment", &assignment.id)
    }

    async fn delete_assignment(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn create_quiz(&self, quiz: Quiz) -> RepoResult<Quiz> {
        Ok(sqlx::query_as::<_, Quiz>(&format!(
            "INSERT INTO quizzes (
                id, course_id, title, description, quiz_type, points, assignment_group,
                shuffle_answers, time_limit, multiple_attempts, how_many_attempts,
                show_correct_answers, access_code, one_question_at_a_time, webcam_required,
                lock_questions_after_answering, published, due_date, available_date,
                until_date, questions, created_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)
             RETURNING {QUIZ_COLUMNS}"
        ))
        .bind(quiz.id)
        .bind(quiz.course_id)
        .bind(quiz.title)
        .bind(quiz.description)
        .bind(quiz.quiz_type)
        .bind(quiz.points)
        .bind(quiz.assignment_group)
        .bind(quiz.shuffle_answers)
        .bind(quiz.time_limit)
        .bind(quiz.multiple_attempts)
        .bind(quiz.how_many_attempts)
        .bind(quiz.show_correct_answers)
        .bind(quiz.access_code)
        .bind(quiz.one_question_at_a_time)
        .bind(quiz.webcam_required)
        .bind(quiz.lock_questions_after_answering)
        .bind(quiz.published)
        .bind(quiz.due_date)
        .bind(quiz.available_date)
        .bind(quiz.until_date)
        .bind(quiz.questions)
        .bind(quiz.created_at)
        .bind(quiz.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_quiz(&self, id: &str) -> RepoResult<Option<Quiz>> {
        Ok(sqlx::query_as::<_, Quiz>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_quizzes(&self, course_id: &str) -> RepoResult<Vec<Quiz>> {
        Ok(sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY created_at"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_quiz(&self, quiz: &Quiz) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE quizzes SET
                title = $1, description = $2, quiz_type = $3, points = $4,
                assignment_group = $5, shuffle_answers = $6, time_limit = $7,
                multiple_attempts = $8, how_many_attempts = $9, show_correct_answers = $10,
                access_code = $11, one_question_at_a_time = $12, webcam_required = $13,
                lock_questions_after_answering = $14, published = $15, due_date = $16,
                available_date = $17, until_date = $18, questions = $19, updated_at = $20
             WHERE id = $21",
        )
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.quiz_type)
        .bind(quiz.points)
        .bind(quiz.assignment_group)
        .bind(quiz.shuffle_answers)
        .bind(quiz.time_limit)
        .bind(quiz.multiple_attempts)
        .bind(quiz.how_many_attempts)
        .bind(quiz.show_correct_answers)
        .bind(&quiz.access_code)
        .bind(quiz.one_question_at_a_time)
        .bind(quiz.webcam_required)
        .bind(quiz.lock_questions_after_answering)
        .bind(quiz.published)
        .bind(quiz.due_date)
        .bind(quiz.available_date)
        .bind(quiz.until_date)
        .bind(&quiz.questions)
        .bind(quiz.updated_at)
        .bind(&quiz.id)
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), "quiz", &quiz.id)
    }

    async fn delete_quiz(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn create_attempt(&self, attempt: QuizAttempt) -> RepoResult<QuizAttempt> {
        let number = attempt.attempt_number;
        sqlx::query_as::<_, QuizAttempt>(&format!(
            "INSERT INTO quiz_attempts (
                id, quiz_id, user_id, attempt_number, status, answers, score, total_points,
                started_at, expires_at, submitted_at, updated_at
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(attempt.id)
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(attempt.attempt_number)
        .bind(attempt.status)
        .bind(attempt.answers)
        .bind(attempt.score)
        .bind(attempt.total_points)
        .bind(attempt.started_at)
        .bind(attempt.expires_at)
        .bind(attempt.submitted_at)
        .bind(attempt.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_unique(err, || format!("attempt {number} already exists")))
    }

    async fn find_attempt(&self, id: &str) -> RepoResult<Option<QuizAttempt>> {
        Ok(sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_attempt(&self, attempt: &QuizAttempt) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE quiz_attempts SET
                status = $1, answers = $2, score = $3, total_points = $4,
                expires_at = $5, submitted_at = $6, updated_at = $7
             WHERE id = $8",
        )
        .bind(attempt.status)
        .bind(&attempt.answers)
        .bind(attempt.score)
        .bind(attempt.total_points)
        .bind(attempt.expires_at)
        .bind(attempt.submitted_at)
        .bind(attempt.updated_at)
        .bind(&attempt.id)
        .execute(&self.pool)
        .await?;
        ensure_found(result.rows_affected(), "attempt", &attempt.id)
    }

    async fn list_attempts(
        &self,
        quiz_id: &str,
        user_id: Option<&str>,
    ) -> RepoResult<Vec<QuizAttempt>> {
        Ok(sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
             WHERE quiz_id = $1 AND ($2::text IS NULL OR user_id = $2)
             ORDER BY user_id, attempt_number"
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_attempts(&self, quiz_id: &str, user_id: &str) -> RepoResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn latest_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<QuizAttempt>> {
        Ok(sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
             WHERE quiz_id = $1 AND user_id = $2
             ORDER BY attempt_number DESC
             LIMIT 1"
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

//! Storage seam. Handlers and services only see these traits; `AppState`
//! carries one `Arc<dyn Store>` chosen at boot.

pub(crate) mod memory;
pub(crate) mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::db::models::{
    Assignment, Course, CourseModule, Enrollment, Quiz, QuizAttempt, Session, User,
};
use crate::db::types::UserRole;

#[derive(Debug, Error)]
pub(crate) enum RepoError {
    #[error("{entity} {id} not found")]
    Missing { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    pub(crate) fn missing(entity: &'static str, id: &str) -> Self {
        Self::Missing { entity, id: id.to_string() }
    }
}

pub(crate) type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Clone, Default)]
pub(crate) struct UserFilter {
    pub(crate) role: Option<UserRole>,
    pub(crate) name: Option<String>,
}

impl UserFilter {
    pub(crate) fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        match self.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                let needle = name.to_lowercase();
                user.first_name.to_lowercase().contains(&needle)
                    || user.last_name.to_lowercase().contains(&needle)
                    || user.username.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> RepoResult<User>;
    async fn find_user(&self, id: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>>;
    async fn save_user(&self, user: &User) -> RepoResult<()>;
    async fn delete_user(&self, id: &str) -> RepoResult<bool>;
    async fn count_users(&self) -> RepoResult<i64>;
}

#[async_trait]
pub(crate) trait SessionRepository: Send + Sync {
    async fn create_session(&self, session: Session) -> RepoResult<Session>;
    async fn find_session(&self, id: &str) -> RepoResult<Option<Session>>;
    async fn delete_session(&self, id: &str) -> RepoResult<bool>;
    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> RepoResult<u64>;
}

#[async_trait]
pub(crate) trait CourseRepository: Send + Sync {
    async fn create_course(&self, course: Course) -> RepoResult<Course>;
    async fn find_course(&self, id: &str) -> RepoResult<Option<Course>>;
    async fn list_courses(&self) -> RepoResult<Vec<Course>>;
    async fn list_courses_for_user(&self, user_id: &str) -> RepoResult<Vec<Course>>;
    async fn save_course(&self, course: &Course) -> RepoResult<()>;
    /// Removes the course with everything it owns.
    async fn delete_course(&self, id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub(crate) trait EnrollmentRepository: Send + Sync {
    /// Returns the existing enrollment when the pair is already enrolled.
    async fn enroll(&self, enrollment: Enrollment) -> RepoResult<Enrollment>;
    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepoResult<Option<Enrollment>>;
    async fn unenroll(&self, user_id: &str, course_id: &str) -> RepoResult<bool>;
    async fn list_course_members(&self, course_id: &str) -> RepoResult<Vec<User>>;
}

#[async_trait]
pub(crate) trait ModuleRepository: Send + Sync {
    async fn create_module(&self, module: CourseModule) -> RepoResult<CourseModule>;
    async fn find_module(&self, id: &str) -> RepoResult<Option<CourseModule>>;
    async fn list_modules(&self, course_id: &str) -> RepoResult<Vec<CourseModule>>;
    async fn save_module(&self, module: &CourseModule) -> RepoResult<()>;
    async fn delete_module(&self, id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub(crate) trait AssignmentRepository: Send + Sync {
    async fn create_assignment(&self, assignment: Assignment) -> RepoResult<Assignment>;
    async fn find_assignment(&self, id: &str) -> RepoResult<Option<Assignment>>;
    async fn list_assignments(&self, course_id: &str) -> RepoResult<Vec<Assignment>>;
    async fn save_assignment(&self, assignment: &Assignment) -> RepoResult<()>;
    async fn delete_assignment(&self, id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub(crate) trait QuizRepository: Send + Sync {
    async fn create_quiz(&self, quiz: Quiz) -> RepoResult<Quiz>;
    async fn find_quiz(&self, id: &str) -> RepoResult<Option<Quiz>>;
    async fn list_quizzes(&self, course_id: &str) -> RepoResult<Vec<Quiz>>;
    async fn save_quiz(&self, quiz: &Quiz) -> RepoResult<()>;
    /// Removes the quiz and its attempts.
    async fn delete_quiz(&self, id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub(crate) trait AttemptRepository: Send + Sync {
    async fn create_attempt(&self, attempt: QuizAttempt) -> RepoResult<QuizAttempt>;
    async fn find_attempt(&self, id: &str) -> RepoResult<Option<QuizAttempt>>;
    async fn save_attempt(&self, attempt: &QuizAttempt) -> RepoResult<()>;
    /// Attempts of a quiz ordered by user then attempt number; narrowed to
    /// one user when `user_id` is given.
    async fn list_attempts(
        &self,
        quiz_id: &str,
        user_id: Option<&str>,
    ) -> RepoResult<Vec<QuizAttempt>>;
    async fn count_attempts(&self, quiz_id: &str, user_id: &str) -> RepoResult<i64>;
    async fn latest_attempt(&self, quiz_id: &str, user_id: &str)
        -> RepoResult<Option<QuizAttempt>>;
}

#[async_trait]
pub(crate) trait Store:
    UserRepository
    + SessionRepository
    + CourseRepository
    + EnrollmentRepository
    + ModuleRepository
    + AssignmentRepository
    + QuizRepository
    + AttemptRepository
{
    fn backend_name(&self) -> &'static str;
    async fn ping(&self) -> RepoResult<()>;
}

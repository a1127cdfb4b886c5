use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::db::models::{
    Assignment, Course, CourseModule, Enrollment, Quiz, QuizAttempt, Session, User,
};
use crate::repositories::{
    AssignmentRepository, AttemptRepository, CourseRepository, EnrollmentRepository,
    ModuleRepository, QuizRepository, RepoError, RepoResult, SessionRepository, Store,
    UserFilter, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    sessions: BTreeMap<String, Session>,
    courses: BTreeMap<String, Course>,
    enrollments: BTreeMap<String, Enrollment>,
    modules: BTreeMap<String, CourseModule>,
    assignments: BTreeMap<String, Assignment>,
    quizzes: BTreeMap<String, Quiz>,
    attempts: BTreeMap<String, QuizAttempt>,
}

impl Tables {
    fn drop_quiz(&mut self, quiz_id: &str) -> bool {
        let removed = self.quizzes.remove(quiz_id).is_some();
        self.attempts.retain(|_, attempt| attempt.quiz_id != quiz_id);
        removed
    }
}

/// Process-local store. Every table sits behind one lock so cascades are
/// observed atomically.
#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(key);
    rows
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: User) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|existing| existing.username == user.username) {
            return Err(RepoError::Conflict(format!("username {} already taken", user.username)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &str) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.username == username).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let rows = tables.users.values().filter(|user| filter.matches(user)).cloned().collect();
        Ok(sorted_by(rows, |user: &User| user.username.clone()))
    }

    async fn save_user(&self, user: &User) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.id != user.id && existing.username == user.username)
        {
            return Err(RepoError::Conflict(format!("username {} already taken", user.username)));
        }
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(RepoError::missing("user", &user.id)),
        }
    }

    async fn delete_user(&self, id: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(id).is_none() {
            return Ok(false);
        }
        tables.sessions.retain(|_, session| session.user_id != id);
        tables.enrollments.retain(|_, enrollment| enrollment.user_id != id);
        tables.attempts.retain(|_, attempt| attempt.user_id != id);
        Ok(true)
    }

    async fn count_users(&self) -> RepoResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_session(&self, session: Session) -> RepoResult<Session> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(RepoError::missing("user", &session.user_id));
        }
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: &str) -> RepoResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> RepoResult<bool> {
        Ok(self.tables.write().await.sessions.remove(id).is_some())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> RepoResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn create_course(&self, course: Course) -> RepoResult<Course> {
        let mut tables = self.tables.write().await;
        if tables.courses.contains_key(&course.id) {
            return Err(RepoError::Conflict(format!("course {} already exists", course.id)));
        }
        tables.courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn find_course(&self, id: &str) -> RepoResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(id).cloned())
    }

    async fn list_courses(&self) -> RepoResult<Vec<Course>> {
        let rows = self.tables.read().await.courses.values().cloned().collect();
        Ok(sorted_by(rows, |course: &Course| (course.number.clone(), course.name.clone())))
    }

    async fn list_courses_for_user(&self, user_id: &str) -> RepoResult<Vec<Course>> {
        let tables = self.tables.read().await;
        let rows = tables
            .enrollments
            .values()
            .filter(|enrollment| enrollment.user_id == user_id)
            .filter_map(|enrollment| tables.courses.get(&enrollment.course_id).cloned())
            .collect();
        Ok(sorted_by(rows, |course: &Course| (course.number.clone(), course.name.clone())))
    }

    async fn save_course(&self, course: &Course) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        match tables.courses.get_mut(&course.id) {
            Some(slot) => {
                *slot = course.clone();
                Ok(())
            }
            None => Err(RepoError::missing("course", &course.id)),
        }
    }

    async fn delete_course(&self, id: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(id).is_none() {
            return Ok(false);
        }
        tables.enrollments.retain(|_, enrollment| enrollment.course_id != id);
        tables.modules.retain(|_, module| module.course_id != id);
        tables.assignments.retain(|_, assignment| assignment.course_id != id);
        let quiz_ids: Vec<String> = tables
            .quizzes
            .values()
            .filter(|quiz| quiz.course_id == id)
            .map(|quiz| quiz.id.clone())
            .collect();
        for quiz_id in quiz_ids {
            tables.drop_quiz(&quiz_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryStore {
    async fn enroll(&self, enrollment: Enrollment) -> RepoResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&enrollment.user_id) {
            return Err(RepoError::missing("user", &enrollment.user_id));
        }
        if !tables.courses.contains_key(&enrollment.course_id) {
            return Err(RepoError::missing("course", &enrollment.course_id));
        }
        if let Some(existing) = tables.enrollments.values().find(|existing| {
            existing.user_id == enrollment.user_id && existing.course_id == enrollment.course_id
        }) {
            return Ok(existing.clone());
        }
        tables.enrollments.insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn find_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> RepoResult<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .values()
            .find(|enrollment| enrollment.user_id == user_id && enrollment.course_id == course_id)
            .cloned())
    }

    async fn unenroll(&self, user_id: &str, course_id: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.enrollments.len();
        tables.enrollments.retain(|_, enrollment| {
            !(enrollment.user_id == user_id && enrollment.course_id == course_id)
        });
        Ok(tables.enrollments.len() != before)
    }

    async fn list_course_members(&self, course_id: &str) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let rows = tables
            .enrollments
            .values()
            .filter(|enrollment| enrollment.course_id == course_id)
            .filter_map(|enrollment| tables.users.get(&enrollment.user_id).cloned())
            .collect();
        Ok(sorted_by(rows, |user: &User| (user.last_name.clone(), user.first_name.clone())))
    }
}

#[async_trait]
impl ModuleRepository for MemoryStore {
    async fn create_module(&self, module: CourseModule) -> RepoResult<CourseModule> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&module.course_id) {
            return Err(RepoError::missing("course", &module.course_id));
        }
        tables.modules.insert(module.id.clone(), module.clone());
        Ok(module)
    }

    async fn find_module(&self, id: &str) -> RepoResult<Option<CourseModule>> {
        Ok(self.tables.read().await.modules.get(id).cloned())
    }

    async fn list_modules(&self, course_id: &str) -> RepoResult<Vec<CourseModule>> {
        let tables = self.tables.read().await;
        let rows = tables
            .modules
            .values()
            .filter(|module| module.course_id == course_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |module: &CourseModule| module.created_at))
    }

    async fn save_module(&self, module: &CourseModule) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        match tables.modules.get_mut(&module.id) {
            Some(slot) => {
                *slot = module.clone();
                Ok(())
            }
            None => Err(RepoError::missing("module", &module.id)),
        }
    }

    async fn delete_module(&self, id: &str) -> RepoResult<bool> {
        Ok(self.tables.write().await.modules.remove(id).is_some())
    }
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn create_assignment(&self, assignment: Assignment) -> RepoResult<Assignment> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&assignment.course_id) {
            return Err(RepoError::missing("course", &assignment.course_id));
        }
        tables.assignments.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment(&self, id: &str) -> RepoResult<Option<Assignment>> {
        Ok(self.tables.read().await.assignments.get(id).cloned())
    }

    async fn list_assignments(&self, course_id: &str) -> RepoResult<Vec<Assignment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .assignments
            .values()
            .filter(|assignment| assignment.course_id == course_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |assignment: &Assignment| assignment.created_at))
    }

    async fn save_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        match tables.assignments.get_mut(&assignment.id) {
            Some(slot) => {
                *slot = assignment.clone();
                Ok(())
            }
            None => Err(RepoError::missing("assignment", &assignment.id)),
        }
    }

    async fn delete_assignment(&self, id: &str) -> RepoResult<bool> {
        Ok(self.tables.write().await.assignments.remove(id).is_some())
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn create_quiz(&self, quiz: Quiz) -> RepoResult<Quiz> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&quiz.course_id) {
            return Err(RepoError::missing("course", &quiz.course_id));
        }
        tables.quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_quiz(&self, id: &str) -> RepoResult<Option<Quiz>> {
        Ok(self.tables.read().await.quizzes.get(id).cloned())
    }

    async fn list_quizzes(&self, course_id: &str) -> RepoResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let rows = tables
            .quizzes
            .values()
            .filter(|quiz| quiz.course_id == course_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |quiz: &Quiz| quiz.created_at))
    }

    async fn save_quiz(&self, quiz: &Quiz) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        match tables.quizzes.get_mut(&quiz.id) {
            Some(slot) => {
                *slot = quiz.clone();
                Ok(())
            }
            None => Err(RepoError::missing("quiz", &quiz.id)),
        }
    }

    async fn delete_quiz(&self, id: &str) -> RepoResult<bool> {
        Ok(self.tables.write().await.drop_quiz(id))
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn create_attempt(&self, attempt: QuizAttempt) -> RepoResult<QuizAttempt> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&attempt.quiz_id) {
            return Err(RepoError::missing("quiz", &attempt.quiz_id));
        }
        if tables.attempts.values().any(|existing| {
            existing.quiz_id == attempt.quiz_id
                && existing.user_id == attempt.user_id
                && existing.attempt_number == attempt.attempt_number
        }) {
            return Err(RepoError::Conflict(format!(
                "attempt {} already exists",
                attempt.attempt_number
            )));
        }
        tables.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, id: &str) -> RepoResult<Option<QuizAttempt>> {
        Ok(self.tables.read().await.attempts.get(id).cloned())
    }

    async fn save_attempt(&self, attempt: &QuizAttempt) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        match tables.attempts.get_mut(&attempt.id) {
            Some(slot) => {
                *slot = attempt.clone();
                Ok(())
            }
            None => Err(RepoError::missing("attempt", &attempt.id)),
        }
    }

    async fn list_attempts(
        &self,
        quiz_id: &str,
        user_id: Option<&str>,
    ) -> RepoResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        let rows = tables
            .attempts
            .values()
            .filter(|attempt| attempt.quiz_id == quiz_id)
            .filter(|attempt| user_id.map_or(true, |user_id| attempt.user_id == user_id))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |attempt: &QuizAttempt| {
            (attempt.user_id.clone(), attempt.attempt_number)
        }))
    }

    async fn count_attempts(&self, quiz_id: &str, user_id: &str) -> RepoResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|attempt| attempt.quiz_id == quiz_id && attempt.user_id == user_id)
            .count() as i64)
    }

    async fn latest_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<QuizAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|attempt| attempt.quiz_id == quiz_id && attempt.user_id == user_id)
            .max_by_key(|attempt| attempt.attempt_number)
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

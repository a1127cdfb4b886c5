pub(crate) mod assignments;
pub(crate) mod attempts;
pub(crate) mod courses;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod modules;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod users;
pub(crate) mod validation;

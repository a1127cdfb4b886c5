pub(crate) mod attempts;
pub(crate) mod grading;
pub(crate) mod keyed_lock;
pub(crate) mod quiz_timing;
pub(crate) mod quizzes;
pub(crate) mod seed;

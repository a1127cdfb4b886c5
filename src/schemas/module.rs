use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{CourseModule, Lesson};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LessonPayload {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
}

impl LessonPayload {
    fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: Some(lesson.id.clone()),
            name: lesson.name.clone(),
            description: lesson.description.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ModuleCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) lessons: Vec<LessonPayload>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ModuleUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) lessons: Option<Vec<LessonPayload>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ModuleResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) course: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) lessons: Vec<LessonPayload>,
}

impl ModuleResponse {
    pub(crate) fn from_db(module: &CourseModule) -> Self {
        Self {
            id: module.id.clone(),
            course: module.course_id.clone(),
            name: module.name.clone(),
            description: module.description.clone(),
            lessons: module.lessons.0.iter().map(LessonPayload::from_lesson).collect(),
        }
    }
}

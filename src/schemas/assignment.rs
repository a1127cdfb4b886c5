use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_offset;
use crate::db::models::Assignment;
use crate::schemas::fields::{nullable_timestamp, optional_number, optional_timestamp};

pub(crate) const DEFAULT_ASSIGNMENT_POINTS: f64 = 100.0;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub(crate) points: Option<f64>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) due_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) available_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub(crate) until_date: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    pub(crate) points: Option<f64>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) due_date: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) available_date: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub(crate) until_date: Option<Option<OffsetDateTime>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) course: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) points: f64,
    pub(crate) due_date: Option<String>,
    pub(crate) available_date: Option<String>,
    pub(crate) until_date: Option<String>,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id.clone(),
            course: assignment.course_id.clone(),
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            points: assignment.points,
            due_date: assignment.due_date.map(format_offset),
            available_date: assignment.available_date.map(format_offset),
            until_date: assignment.until_date.map(format_offset),
        }
    }
}

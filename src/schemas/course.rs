use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::format_date;
use crate::schemas::fields::{nullable, nullable_date, optional_date};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseCreate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) number: Option<String>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "credits must not be negative"))]
    pub(crate) credits: Option<i32>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub(crate) start_date: Option<Date>,
    #[serde(default, deserialize_with = "optional_date")]
    pub(crate) end_date: Option<Date>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) number: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) department: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) credits: Option<Option<i32>>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "nullable_date")]
    pub(crate) start_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable_date")]
    pub(crate) end_date: Option<Option<Date>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseResponse {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) number: String,
    pub(crate) department: Option<String>,
    pub(crate) credits: Option<i32>,
    pub(crate) description: String,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) author: Option<String>,
}

impl CourseResponse {
    pub(crate) fn from_db(course: &crate::db::models::Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            number: course.number.clone(),
            department: course.department.clone(),
            credits: course.credits,
            description: course.description.clone(),
            start_date: course.start_date.map(format_date),
            end_date: course.end_date.map(format_date),
            author: course.author.clone(),
        }
    }
}

use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod assignment;
pub(crate) mod attempt;
pub(crate) mod course;
pub(crate) mod fields;
pub(crate) mod module;
pub(crate) mod quiz;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) store: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::TaskStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[schema(example = "Draft landing page copy")]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Defaults to `todo`
    pub status: Option<TaskStatus>,

    pub due_utc: Option<DateTime<Utc>>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub due_utc: Option<DateTime<Utc>>,
}

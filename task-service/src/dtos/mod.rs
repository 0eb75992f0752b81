pub mod auth;
pub mod projects;
pub mod tasks;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body produced by `AppError`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Invalid credentials")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

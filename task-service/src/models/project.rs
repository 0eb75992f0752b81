use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A project owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Project {
    pub project_id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "Website relaunch")]
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: Uuid, name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id: Uuid::new_v4(),
            owner_id,
            name,
            description,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

//! Persistence seams for users, projects and tasks.
//!
//! `Database` is the PostgreSQL implementation; `InMemoryStore` backs tests
//! and local development.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::Database;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Project, Task, User};
use crate::services::ServiceError;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Find the user whose stored refresh digest is `token_hash`. Expiry is
    /// not checked here.
    async fn find_user_by_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
    ) -> Result<Option<User>, ServiceError>;

    /// Fails with `EmailAlreadyRegistered` on a duplicate email.
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError>;

    /// Overwrite the user's refresh digest and expiry unconditionally.
    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), ServiceError>;

    /// Replace the refresh digest only if the stored one is still
    /// `current_hash` and unexpired. Returns whether the swap happened.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        new_expiry_utc: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    async fn clear_refresh_token(&self, user_id: Uuid) -> Result<(), ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>, ServiceError>;
    async fn find_project_by_id(&self, project_id: Uuid) -> Result<Option<Project>, ServiceError>;
    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError>;
    async fn update_project(&self, project: &Project) -> Result<(), ServiceError>;
    /// Deletes the project and its tasks. Returns false if nothing was deleted.
    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError>;

    async fn list_tasks_for_project(&self, project_id: Uuid) -> Result<Vec<Task>, ServiceError>;
    async fn find_task(&self, project_id: Uuid, task_id: Uuid)
        -> Result<Option<Task>, ServiceError>;
    async fn insert_task(&self, task: &Task) -> Result<(), ServiceError>;
    async fn update_task(&self, task: &Task) -> Result<(), ServiceError>;
    async fn delete_task(&self, project_id: Uuid, task_id: Uuid) -> Result<bool, ServiceError>;
}

//! PostgreSQL store.
//!
//! Uses runtime-checked `sqlx` queries against the schema in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{ProjectStore, UserStore};
use crate::models::{Project, Task, User};
use crate::services::ServiceError;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl UserStore for Database {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
    ) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE user_id = $1 AND refresh_token = $2",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, password_hash, refresh_token, refresh_token_expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.refresh_token)
        .bind(user.refresh_token_expiry_utc)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                ServiceError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $1, refresh_token_expiry_utc = $2 WHERE user_id = $3",
        )
        .bind(token_hash)
        .bind(expiry_utc)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UserNotFound);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        new_expiry_utc: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        // Single conditional UPDATE: of two concurrent rotations with the same
        // token, the second sees the new digest and matches no row.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $1, refresh_token_expiry_utc = $2
            WHERE user_id = $3 AND refresh_token = $4 AND refresh_token_expiry_utc > NOW()
            "#,
        )
        .bind(new_hash)
        .bind(new_expiry_utc)
        .bind(user_id)
        .bind(current_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE users SET refresh_token = NULL, refresh_token_expiry_utc = NULL WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            ServiceError::Database(e)
        })?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for Database {
    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE owner_id = $1 ORDER BY created_utc",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn find_project_by_id(&self, project_id: Uuid) -> Result<Option<Project>, ServiceError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO projects (project_id, owner_id, name, description, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(project.project_id)
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_utc)
        .bind(project.updated_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE projects SET name = $1, description = $2, updated_utc = $3 WHERE project_id = $4",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.updated_utc)
        .bind(project.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::ProjectNotFound);
        }
        Ok(())
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError> {
        // Tasks go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE project_id = $1 ORDER BY created_utc",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn find_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, ServiceError> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE task_id = $1 AND project_id = $2",
        )
        .bind(task_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (task_id, project_id, title, description, status_code, due_utc, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(task.task_id)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.status_code)
        .bind(task.due_utc)
        .bind(task.created_utc)
        .bind(task.updated_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<(), ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, status_code = $3, due_utc = $4, updated_utc = $5
            WHERE task_id = $6 AND project_id = $7
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.status_code)
        .bind(task.due_utc)
        .bind(task.updated_utc)
        .bind(task.task_id)
        .bind(task.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::TaskNotFound);
        }
        Ok(())
    }

    async fn delete_task(&self, project_id: Uuid, task_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = $1 AND project_id = $2")
            .bind(task_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

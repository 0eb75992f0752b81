use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProjectStore, UserStore};
use crate::models::{Project, Task, User};
use crate::services::ServiceError;

/// Process-local store for tests and `STORE_BACKEND=memory`.
///
/// Each map sits behind its own `RwLock`; refresh-token rotation takes the
/// users write lock for the compare and the swap.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    projects: RwLock<HashMap<Uuid, Project>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent user write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "In-memory store rejected write"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = crate::models::user::normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
    ) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .filter(|u| u.refresh_token.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::EmailAlreadyRegistered);
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(ServiceError::UserNotFound)?;
        user.refresh_token = Some(token_hash.to_string());
        user.refresh_token_expiry_utc = Some(expiry_utc);
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        new_expiry_utc: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };

        if !user.holds_refresh_token(current_hash, Utc::now()) {
            return Ok(false);
        }

        user.refresh_token = Some(new_hash.to_string());
        user.refresh_token_expiry_utc = Some(new_expiry_utc);
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.check_writable()?;
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.refresh_token = None;
            user.refresh_token_expiry_utc = None;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn list_projects_for_owner(&self, owner_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.created_utc);
        Ok(projects)
    }

    async fn find_project_by_id(&self, project_id: Uuid) -> Result<Option<Project>, ServiceError> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError> {
        self.projects
            .write()
            .await
            .insert(project.project_id, project.clone());
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> Result<(), ServiceError> {
        let mut projects = self.projects.write().await;
        let existing = projects
            .get_mut(&project.project_id)
            .ok_or(ServiceError::ProjectNotFound)?;
        *existing = project.clone();
        Ok(())
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError> {
        let removed = self.projects.write().await.remove(&project_id).is_some();
        if removed {
            self.tasks
                .write()
                .await
                .retain(|_, t| t.project_id != project_id);
        }
        Ok(removed)
    }

    async fn list_tasks_for_project(&self, project_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_utc);
        Ok(tasks)
    }

    async fn find_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, ServiceError> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&task_id)
            .filter(|t| t.project_id == project_id)
            .cloned())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), ServiceError> {
        if !self.projects.read().await.contains_key(&task.project_id) {
            return Err(ServiceError::ProjectNotFound);
        }
        self.tasks.write().await.insert(task.task_id, task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<(), ServiceError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.task_id) {
            Some(existing) if existing.project_id == task.project_id => {
                *existing = task.clone();
                Ok(())
            }
            _ => Err(ServiceError::TaskNotFound),
        }
    }

    async fn delete_task(&self, project_id: Uuid, task_id: Uuid) -> Result<bool, ServiceError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&task_id) {
            Some(t) if t.project_id == project_id => {
                tasks.remove(&task_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

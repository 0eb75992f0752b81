use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::projects::{CreateProjectRequest, UpdateProjectRequest},
    dtos::tasks::{CreateTaskRequest, UpdateTaskRequest},
    models::{Project, Task, TaskResponse, TaskStatus},
    services::{AuthorizationService, ProjectStore, ServiceError},
};

/// Project and task operations, every one gated on project ownership.
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    authz: AuthorizationService,
}

impl ProjectService {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self {
            store,
            authz: AuthorizationService,
        }
    }

    pub async fn list_projects(&self, user_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        self.store.list_projects_for_owner(user_id).await
    }

    pub async fn create_project(
        &self,
        user_id: Uuid,
        req: CreateProjectRequest,
    ) -> Result<Project, ServiceError> {
        let project = Project::new(user_id, req.name, req.description);
        self.store.insert_project(&project).await?;

        tracing::info!(user_id = %user_id, project_id = %project.project_id, "Project created");
        Ok(project)
    }

    pub async fn get_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Project, ServiceError> {
        self.owned_project(user_id, project_id).await
    }

    pub async fn update_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Project, ServiceError> {
        let mut project = self.owned_project(user_id, project_id).await?;

        if let Some(name) = req.name {
            project.name = name;
        }
        if let Some(description) = req.description {
            project.description = Some(description);
        }
        project.updated_utc = Utc::now();

        self.store.update_project(&project).await?;
        Ok(project)
    }

    pub async fn delete_project(&self, user_id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.owned_project(user_id, project_id).await?;

        if !self.store.delete_project(project_id).await? {
            return Err(ServiceError::ProjectNotFound);
        }

        tracing::info!(user_id = %user_id, project_id = %project_id, "Project deleted");
        Ok(())
    }

    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<TaskResponse>, ServiceError> {
        self.owned_project(user_id, project_id).await?;

        let tasks = self.store.list_tasks_for_project(project_id).await?;
        Ok(tasks.into_iter().map(TaskResponse::from).collect())
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: CreateTaskRequest,
    ) -> Result<TaskResponse, ServiceError> {
        self.owned_project(user_id, project_id).await?;

        let task = Task::new(
            project_id,
            req.title,
            req.description,
            req.status.unwrap_or(TaskStatus::Todo),
            req.due_utc,
        );
        self.store.insert_task(&task).await?;

        Ok(task.into())
    }

    pub async fn get_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<TaskResponse, ServiceError> {
        self.owned_project(user_id, project_id).await?;
        self.find_task(project_id, task_id).await.map(TaskResponse::from)
    }

    pub async fn update_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        req: UpdateTaskRequest,
    ) -> Result<TaskResponse, ServiceError> {
        self.owned_project(user_id, project_id).await?;
        let mut task = self.find_task(project_id, task_id).await?;

        if let Some(title) = req.title {
            task.title = title;
        }
        if let Some(description) = req.description {
            task.description = Some(description);
        }
        if let Some(status) = req.status {
            task.set_status(status);
        }
        if let Some(due_utc) = req.due_utc {
            task.due_utc = Some(due_utc);
        }
        task.updated_utc = Utc::now();

        self.store.update_task(&task).await?;
        Ok(task.into())
    }

    pub async fn delete_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.owned_project(user_id, project_id).await?;

        if !self.store.delete_task(project_id, task_id).await? {
            return Err(ServiceError::TaskNotFound);
        }
        Ok(())
    }

    /// Load a project and check `user_id` owns it. Missing is 404, foreign is 403.
    async fn owned_project(&self, user_id: Uuid, project_id: Uuid) -> Result<Project, ServiceError> {
        let project = self
            .store
            .find_project_by_id(project_id)
            .await?
            .ok_or(ServiceError::ProjectNotFound)?;

        self.authz.authorize_project(user_id, &project).into_result()?;
        Ok(project)
    }

    async fn find_task(&self, project_id: Uuid, task_id: Uuid) -> Result<Task, ServiceError> {
        self.store
            .find_task(project_id, task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }
}

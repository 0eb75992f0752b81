use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::tasks::{CreateTaskRequest, UpdateTaskRequest},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Tasks in the project", body = [TaskResponse]),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = state
        .project_service
        .list_tasks(user.user_id, project_id)
        .await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .project_service
        .create_task(user.user_id, project_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks/{task_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project or task not found", body = ErrorResponse)
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .project_service
        .get_task(user.user_id, project_id, task_id)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}/tasks/{task_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project or task not found", body = ErrorResponse)
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .project_service
        .update_task(user.user_id, project_id, task_id, req)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/tasks/{task_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project or task not found", body = ErrorResponse)
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .project_service
        .delete_task(user.user_id, project_id, task_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

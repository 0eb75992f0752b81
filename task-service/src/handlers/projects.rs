use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::projects::{CreateProjectRequest, UpdateProjectRequest},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// List the caller's projects
#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "Projects owned by the caller", body = [Project]),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let projects = state.project_service.list_projects(user.user_id).await?;
    Ok(Json(projects))
}

/// Create a project owned by the caller
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .create_project(user.user_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .get_project(user.user_id, project_id)
        .await?;
    Ok(Json(project))
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .project_service
        .update_project(user.user_id, project_id, req)
        .await?;
    Ok(Json(project))
}

/// Delete a project and all of its tasks
#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "Projects",
    security(("bearer_auth" = []))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .project_service
        .delete_project(user.user_id, project_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

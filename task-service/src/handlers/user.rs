use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{middleware::AuthUser, AppState};

/// Current user profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let me = state.auth_service.current_user(user.user_id).await?;
    Ok(Json(me))
}

//! Service-level errors and their HTTP mapping.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::InvalidToken => AppError::BadRequest(anyhow::anyhow!("Invalid token")),
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::ProjectNotFound => {
                AppError::NotFound(anyhow::anyhow!("Project not found"))
            }
            ServiceError::TaskNotFound => AppError::NotFound(anyhow::anyhow!("Task not found")),
            ServiceError::Forbidden(reason) => AppError::Forbidden(anyhow::anyhow!(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(ServiceError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ServiceError::InvalidToken), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::EmailAlreadyRegistered), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ServiceError::Forbidden("nope".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(ServiceError::TaskNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ServiceError::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

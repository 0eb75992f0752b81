use uuid::Uuid;

use crate::models::Project;
use crate::services::ServiceError;

/// Outcome of an access check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuthorizationResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Turn a denial into `ServiceError::Forbidden` carrying the reason.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                self.reason.unwrap_or_else(|| "Access denied".to_string()),
            ))
        }
    }
}

pub const NOT_PROJECT_OWNER: &str = "You do not own this project";

/// Ownership checks for project-scoped resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationService;

impl AuthorizationService {
    pub fn authorize_project(&self, user_id: Uuid, project: &Project) -> AuthorizationResult {
        if project.is_owned_by(user_id) {
            AuthorizationResult::allow()
        } else {
            tracing::warn!(
                user_id = %user_id,
                project_id = %project.project_id,
                "Project access denied"
            );
            AuthorizationResult::deny(NOT_PROJECT_OWNER)
        }
    }
}

//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity.
///
/// `refresh_token` holds the SHA-256 digest of the single live refresh token,
/// never the token itself.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub refresh_token_expiry_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user. The email is stored lowercased.
    pub fn new(username: String, email: &str, password_hash: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            username,
            email: normalize_email(email),
            password_hash,
            refresh_token: None,
            refresh_token_expiry_utc: None,
            created_utc: Utc::now(),
        }
    }

    /// True when `token_hash` is the stored digest and it has not expired at `now`.
    pub fn holds_refresh_token(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token, self.refresh_token_expiry_utc) {
            (Some(stored), Some(expiry)) => stored == token_hash && expiry > now,
            _ => false,
        }
    }

    /// Convert to sanitized response (no sensitive fields).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "user@example.com")]
    pub email: String,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            username: u.username,
            email: u.email,
            created_utc: u.created_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new("jdoe".to_string(), "  JDoe@Example.COM ", "hash".to_string());
        assert_eq!(user.email, "jdoe@example.com");
        assert!(user.refresh_token.is_none());
    }

    #[test]
    fn test_holds_refresh_token() {
        let now = Utc::now();
        let mut user = User::new("jdoe".to_string(), "jdoe@example.com", "hash".to_string());
        assert!(!user.holds_refresh_token("digest", now));

        user.refresh_token = Some("digest".to_string());
        user.refresh_token_expiry_utc = Some(now + Duration::days(1));
        assert!(user.holds_refresh_token("digest", now));
        assert!(!user.holds_refresh_token("other", now));

        // Expired
        user.refresh_token_expiry_utc = Some(now - Duration::seconds(1));
        assert!(!user.holds_refresh_token("digest", now));
    }

    #[test]
    fn test_sanitized_omits_secrets() {
        let mut user = User::new("jdoe".to_string(), "jdoe@example.com", "hash".to_string());
        user.refresh_token = Some("digest".to_string());

        let json = serde_json::to_value(user.sanitized()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["username"], "jdoe");
    }
}

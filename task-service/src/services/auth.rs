use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::auth::RegisterRequest,
    models::{IssuedRefreshToken, User, UserResponse},
    services::{metrics::record_auth_event, JwtService, ServiceError, TokenResponse, UserStore},
    utils::{burn_verification, hash_password, verify_password, Password, PasswordHashString},
};

/// Credential checks and the access/refresh token lifecycle.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, ServiceError> {
        if self.users.find_user_by_email(&req.email).await?.is_some() {
            record_auth_event("register", "conflict");
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let user = User::new(req.username, &req.email, password_hash.into_string());

        // The store's unique index still catches a concurrent duplicate.
        self.users.insert_user(&user).await?;

        record_auth_event("register", "success");
        tracing::info!(user_id = %user.user_id, "User registered");

        Ok(user.sanitized())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let password = Password::new(password.to_string());

        let Some(user) = self.users.find_user_by_email(email).await? else {
            burn_verification(&password);
            record_auth_event("login", "failure");
            return Err(ServiceError::InvalidCredentials);
        };

        if verify_password(
            &password,
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .is_err()
        {
            record_auth_event("login", "failure");
            tracing::info!(user_id = %user.user_id, "Login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let tokens = self.issue_token_pair(&user).await?;

        record_auth_event("login", "success");
        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok(tokens)
    }

    /// Exchange a refresh token for a new pair. The presented token stops
    /// working as soon as this succeeds.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        user_id: Uuid,
    ) -> Result<TokenResponse, ServiceError> {
        let presented_hash = IssuedRefreshToken::hash_token(refresh_token);

        let user = self
            .users
            .find_user_by_refresh_token(&presented_hash, user_id)
            .await?
            .ok_or_else(|| {
                record_auth_event("refresh", "failure");
                ServiceError::InvalidToken
            })?;

        if !user.holds_refresh_token(&presented_hash, Utc::now()) {
            record_auth_event("refresh", "failure");
            tracing::warn!(user_id = %user.user_id, "Expired refresh token presented");
            return Err(ServiceError::InvalidToken);
        }

        let tokens = self.rotate_token_pair(&user, &presented_hash).await?;

        record_auth_event("refresh", "success");
        tracing::info!(user_id = %user.user_id, "Token refreshed for user");

        Ok(tokens)
    }

    /// Revoke the user's refresh token.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.users.clear_refresh_token(user_id).await?;

        record_auth_event("logout", "success");
        tracing::info!(user_id = %user_id, "User logged out");

        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(ServiceError::UserNotFound)
    }

    /// Mint a token pair for `user` and persist the refresh token digest,
    /// overwriting whatever the user held before. Nothing is returned unless
    /// the write succeeds.
    pub async fn issue_token_pair(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        let access_token = self.generate_access_token(user)?;
        let refresh = IssuedRefreshToken::generate(self.jwt.refresh_token_expiry_days());

        self.users
            .save_refresh_token(user.user_id, &refresh.token_hash, refresh.expires_utc)
            .await?;

        Ok(self.token_response(user, access_token, refresh))
    }

    /// Same as `issue_token_pair`, but the write only lands if the user still
    /// holds `current_hash`. Losing the race is an invalid token.
    async fn rotate_token_pair(
        &self,
        user: &User,
        current_hash: &str,
    ) -> Result<TokenResponse, ServiceError> {
        let access_token = self.generate_access_token(user)?;
        let refresh = IssuedRefreshToken::generate(self.jwt.refresh_token_expiry_days());

        let swapped = self
            .users
            .rotate_refresh_token(
                user.user_id,
                current_hash,
                &refresh.token_hash,
                refresh.expires_utc,
            )
            .await?;

        if !swapped {
            record_auth_event("refresh", "reused");
            tracing::warn!(user_id = %user.user_id, "Refresh token already rotated");
            return Err(ServiceError::InvalidToken);
        }

        Ok(self.token_response(user, access_token, refresh))
    }

    fn generate_access_token(&self, user: &User) -> Result<String, ServiceError> {
        self.jwt
            .generate_access_token(user.user_id, &user.username, &user.email)
            .map_err(ServiceError::Internal)
    }

    fn token_response(
        &self,
        user: &User,
        access_token: String,
        refresh: IssuedRefreshToken,
    ) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
            user_id: user.user_id,
        }
    }
}

//! Shared setup for task-service integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use task_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig, StoreBackend,
        TaskConfig,
    },
    services::InMemoryStore,
    AppState,
};
use tower::util::ServiceExt;

pub const TEST_PASSWORD: &str = "correct horse battery";

pub fn test_config() -> TaskConfig {
    TaskConfig {
        common: service_core::config::Config { port: 0 },
        environment: Environment::Dev,
        service_name: "task-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret-0123456789abcdef".to_string()),
            issuer: "task-service".to_string(),
            audience: "task-client".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

/// Router over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(test_config())
    }

    pub fn spawn_with(config: TaskConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, store.clone(), store.clone())
            .expect("Failed to build app state");
        let router = build_router(state.clone());
        Self {
            router,
            state,
            store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn register(&self, username: &str, email: &str) -> Value {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": TEST_PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    /// Register and log in; returns the token response body.
    pub async fn login_new_user(&self, username: &str, email: &str) -> Value {
        self.register(username, email).await;
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body
    }
}

pub fn access_token(tokens: &Value) -> String {
    tokens["access_token"].as_str().unwrap().to_string()
}

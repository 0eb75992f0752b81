//! Task service client.

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::refresh::{RefreshCoordinator, RefreshFailure, RefreshGuard, RefreshTicket};
use crate::types::{
    ClientConfig, ErrorBody, LoginRequest, Project, ProjectInput, RefreshRequest,
    RegisterRequest, Session, Task, TaskInput, TokenPair, UserInfo,
};

/// Notified when the client drops its session because a refresh failed.
pub trait SessionListener: Send + Sync {
    fn on_logout(&self);
}

/// Listener that ignores logouts.
pub struct NoopSessionListener;

impl SessionListener for NoopSessionListener {
    fn on_logout(&self) {}
}

/// Client for the task service.
///
/// Authorized calls attach the current access token. A 401 triggers one
/// shared refresh through the [`RefreshCoordinator`] and a single retry.
/// If the refresh fails, the session is cleared and the [`SessionListener`]
/// is told once.
pub struct TaskClient {
    http: Client,
    base_url: String,
    config: ClientConfig,
    session: RwLock<Option<Session>>,
    coordinator: Arc<RefreshCoordinator>,
    listener: Arc<dyn SessionListener>,
}

impl TaskClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(RefreshCoordinator::new()),
            Arc::new(NoopSessionListener),
        )
    }

    /// Build a client around an existing coordinator and listener.
    pub fn with_parts(
        config: ClientConfig,
        coordinator: Arc<RefreshCoordinator>,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(format!("task-client/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            http,
            base_url,
            config,
            session: RwLock::new(None),
            coordinator,
            listener,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Restore a previously saved session.
    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserInfo> {
        let response = self
            .http
            .post(self.endpoint("/auth/register"))
            .json(&RegisterRequest {
                username,
                email,
                password,
            })
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        parse_json(response, "registration").await
    }

    /// Log in and keep the returned session for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        debug!(email = %email, "Attempting login");

        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Login failed: invalid credentials");
            return Err(ClientError::AuthFailed(error_message(response).await));
        }

        let pair: TokenPair = parse_json(response, "login").await?;
        self.set_session(Session::from(pair.clone())).await;

        info!(user_id = %pair.user_id, "Login successful");
        Ok(pair)
    }

    /// Revoke the refresh token on the server and forget the local session.
    pub async fn logout(&self) -> Result<()> {
        let result = self.send_authorized(Method::POST, "/auth/logout", None::<&()>).await;
        *self.session.write().await = None;

        let response = result?;
        ensure_success(response).await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn me(&self) -> Result<UserInfo> {
        self.get_json("/users/me").await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_json("/projects").await
    }

    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Result<Project> {
        let input = ProjectInput {
            name: Some(name.to_string()),
            description: description.map(str::to_string),
        };
        let response = self
            .send_authorized(Method::POST, "/projects", Some(&input))
            .await?;
        parse_json(response, "project").await
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<Project> {
        self.get_json(&format!("/projects/{}", project_id)).await
    }

    pub async fn update_project(&self, project_id: Uuid, input: &ProjectInput) -> Result<Project> {
        let response = self
            .send_authorized(
                Method::PATCH,
                &format!("/projects/{}", project_id),
                Some(input),
            )
            .await?;
        parse_json(response, "project").await
    }

    pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
        let response = self
            .send_authorized(
                Method::DELETE,
                &format!("/projects/{}", project_id),
                None::<&()>,
            )
            .await?;
        ensure_success(response).await
    }

    pub async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<Task>> {
        self.get_json(&format!("/projects/{}/tasks", project_id)).await
    }

    pub async fn create_task(&self, project_id: Uuid, input: &TaskInput) -> Result<Task> {
        let response = self
            .send_authorized(
                Method::POST,
                &format!("/projects/{}/tasks", project_id),
                Some(input),
            )
            .await?;
        parse_json(response, "task").await
    }

    pub async fn get_task(&self, project_id: Uuid, task_id: Uuid) -> Result<Task> {
        self.get_json(&format!("/projects/{}/tasks/{}", project_id, task_id))
            .await
    }

    pub async fn update_task(
        &self,
        project_id: Uuid,
        task_id: Uuid,
        input: &TaskInput,
    ) -> Result<Task> {
        let response = self
            .send_authorized(
                Method::PATCH,
                &format!("/projects/{}/tasks/{}", project_id, task_id),
                Some(input),
            )
            .await?;
        parse_json(response, "task").await
    }

    pub async fn delete_task(&self, project_id: Uuid, task_id: Uuid) -> Result<()> {
        let response = self
            .send_authorized(
                Method::DELETE,
                &format!("/projects/{}/tasks/{}", project_id, task_id),
                None::<&()>,
            )
            .await?;
        ensure_success(response).await
    }

    /// Send a request with the bearer token, refreshing once on 401.
    ///
    /// Non-401 responses, including other errors, are returned untouched.
    pub async fn send_authorized<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let mut token = self
            .current_access_token()
            .await
            .ok_or(ClientError::AuthRequired)?;
        let mut retried = false;

        loop {
            let mut request = self.http.request(method.clone(), &url).bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(ClientError::from_transport)?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if retried {
                warn!(path = %path, "Request rejected again after refresh");
                return Err(ClientError::AuthRequired);
            }
            retried = true;

            // Someone may already have refreshed while this request was in flight.
            token = match self.current_access_token().await {
                None => return Err(ClientError::AuthRequired),
                Some(current) if current != token => current,
                Some(_) => self.await_or_trigger_refresh(&token).await?,
            };
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .send_authorized(Method::GET, path, None::<&()>)
            .await?;
        parse_json(response, path).await
    }

    async fn current_access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    async fn await_or_trigger_refresh(&self, rejected_token: &str) -> Result<String> {
        match self.coordinator.enqueue_or_trigger() {
            RefreshTicket::Leader(guard) => {
                // A refresh may have finished between the 401 and taking the lead.
                if let Some(current) = self.current_access_token().await {
                    if current != rejected_token {
                        guard.resolve(Ok(current.clone()));
                        return Ok(current);
                    }
                }
                self.lead_refresh(guard).await
            }
            RefreshTicket::Waiter(rx) => match rx.await {
                Ok(Ok(access_token)) => Ok(access_token),
                Ok(Err(RefreshFailure::Rejected(message))) => {
                    Err(ClientError::TokenRefreshFailed(message))
                }
                Ok(Err(RefreshFailure::Cancelled)) | Err(_) => Err(ClientError::RefreshCancelled),
            },
        }
    }

    async fn lead_refresh(&self, guard: RefreshGuard<'_>) -> Result<String> {
        match self.perform_refresh().await {
            Ok(access_token) => {
                let released = guard.resolve(Ok(access_token.clone()));
                debug!(released, "Token refresh successful");
                Ok(access_token)
            }
            Err(e) => {
                let message = e.to_string();
                let had_session = self.session.write().await.take().is_some();
                let released = guard.resolve(Err(RefreshFailure::Rejected(message.clone())));
                warn!(released, error = %message, "Token refresh failed; logging out");

                if had_session {
                    self.listener.on_logout();
                }
                Err(ClientError::TokenRefreshFailed(message))
            }
        }
    }

    /// Call `/auth/refresh` and store the rotated session. Bounded by
    /// `refresh_timeout`.
    async fn perform_refresh(&self) -> Result<String> {
        let (refresh_token, user_id) = {
            let session = self.session.read().await;
            let session = session.as_ref().ok_or(ClientError::AuthRequired)?;
            (session.refresh_token.clone(), session.user_id)
        };

        let request = self
            .http
            .post(self.endpoint("/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
                user_id,
            })
            .send();

        let response = tokio::time::timeout(self.config.refresh_timeout, request)
            .await
            .map_err(|_| {
                ClientError::TokenRefreshFailed(format!(
                    "refresh did not complete within {:?}",
                    self.config.refresh_timeout
                ))
            })?
            .map_err(ClientError::from_transport)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::TokenRefreshFailed(error_message(response).await));
        }

        let pair: TokenPair = parse_json(response, "refresh").await?;
        let access_token = pair.access_token.clone();
        self.set_session(Session::from(pair)).await;

        Ok(access_token)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(ClientError::InvalidUrl("URL cannot be empty".into()));
    }

    let parsed = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text)
}

async fn ensure_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::ServerError {
            status: status.as_u16(),
            message: error_message(response).await,
        })
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::ServerError {
            status: status.as_u16(),
            message: error_message(response).await,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse {} response: {}", what, e)))
}

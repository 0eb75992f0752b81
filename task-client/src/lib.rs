//! Client for the task service.
//!
//! Wraps the REST API and handles access-token expiry: concurrent requests
//! that hit a 401 share one `/auth/refresh` call, each is retried at most
//! once, and a failed refresh logs the client out.
//!
//! ```ignore
//! use task_client::{ClientConfig, TaskClient};
//!
//! let client = TaskClient::new(ClientConfig::new("https://tasks.example.com"))?;
//! client.login("user@example.com", "password").await?;
//! let projects = client.list_projects().await?;
//! ```

mod client;
mod error;
mod refresh;
mod types;

pub use client::{NoopSessionListener, SessionListener, TaskClient};
pub use error::{ClientError, Result};
pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshGuard, RefreshOutcome, RefreshTicket};
pub use types::{
    ClientConfig, Project, ProjectInput, Session, Task, TaskInput, TaskStatus, TokenPair,
    UserInfo, DEFAULT_REFRESH_TIMEOUT,
};

//! Services layer for task-service.
//!
//! Authentication, ownership checks and the project/task operations, all
//! written against the store traits in `store`.

pub mod auth;
pub mod authorization;
pub mod error;
mod jwt;
pub mod metrics;
pub mod projects;
pub mod store;

pub use auth::AuthService;
pub use authorization::{AuthorizationResult, AuthorizationService};
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService, TokenResponse};
pub use projects::ProjectService;
pub use store::{Database, InMemoryStore, ProjectStore, UserStore};

pub mod project;
pub mod refresh_token;
pub mod task;
pub mod user;

pub use project::Project;
pub use refresh_token::IssuedRefreshToken;
pub use task::{Task, TaskResponse, TaskStatus};
pub use user::{User, UserResponse};

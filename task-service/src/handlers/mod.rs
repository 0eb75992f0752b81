//! HTTP handlers for task-service.

pub mod auth;
pub mod metrics;
pub mod projects;
pub mod tasks;
pub mod user;

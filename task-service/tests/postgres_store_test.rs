//! Runs against a live PostgreSQL named by `DATABASE_URL`.

use chrono::{Duration, Utc};
use task_service::{
    config::DatabaseConfig,
    db,
    models::{Project, Task, TaskStatus, User},
    services::{Database, ProjectStore, ServiceError, UserStore},
};
use uuid::Uuid;

async fn database() -> Database {
    dotenvy::dotenv().ok();
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        min_connections: 1,
    };
    db::connect(&config)
        .await
        .expect("Failed to connect to PostgreSQL")
}

fn unique_user() -> User {
    let tag = Uuid::new_v4().simple().to_string();
    User::new(
        format!("user_{}", &tag[..8]),
        &format!("{}@example.com", tag),
        "hash".to_string(),
    )
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rotation_is_compare_and_swap() {
    let db = database().await;
    let user = unique_user();
    db.insert_user(&user).await.unwrap();

    let expiry = Utc::now() + Duration::days(7);
    db.save_refresh_token(user.user_id, "old", expiry).await.unwrap();

    assert!(db
        .rotate_refresh_token(user.user_id, "old", "new", expiry)
        .await
        .unwrap());
    assert!(!db
        .rotate_refresh_token(user.user_id, "old", "other", expiry)
        .await
        .unwrap());

    let found = db
        .find_user_by_refresh_token("new", user.user_id)
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_maps_to_conflict() {
    let db = database().await;
    let user = unique_user();
    db.insert_user(&user).await.unwrap();

    let mut dup = unique_user();
    dup.email = user.email.to_uppercase();
    let err = db.insert_user(&dup).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmailAlreadyRegistered));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_project_delete_cascades() {
    let db = database().await;
    let user = unique_user();
    db.insert_user(&user).await.unwrap();

    let project = Project::new(user.user_id, "p".to_string(), None);
    db.insert_project(&project).await.unwrap();
    let task = Task::new(project.project_id, "t".to_string(), None, TaskStatus::Done, None);
    db.insert_task(&task).await.unwrap();

    assert!(db.delete_project(project.project_id).await.unwrap());
    assert!(db
        .find_task(project.project_id, task.task_id)
        .await
        .unwrap()
        .is_none());
}

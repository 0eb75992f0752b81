//! Client behavior against a mocked task service.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use task_client::{
    ClientConfig, ClientError, RefreshCoordinator, Session, SessionListener, TaskClient,
};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OLD_ACCESS: &str = "access-old";
const NEW_ACCESS: &str = "access-new";
const OLD_REFRESH: &str = "refresh-old";
const NEW_REFRESH: &str = "refresh-new";

#[derive(Default)]
struct CountingListener {
    logouts: AtomicUsize,
}

impl CountingListener {
    fn count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl SessionListener for CountingListener {
    fn on_logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

fn token_pair(user_id: Uuid, access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "Bearer",
        "expires_in": 900,
        "user_id": user_id,
    })
}

fn project_json(owner_id: Uuid, name: &str) -> serde_json::Value {
    json!({
        "project_id": Uuid::new_v4(),
        "owner_id": owner_id,
        "name": name,
        "description": null,
        "created_utc": "2024-01-01T00:00:00Z",
        "updated_utc": "2024-01-01T00:00:00Z",
    })
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" }))
}

async fn logged_in_client(
    config: ClientConfig,
    listener: Arc<CountingListener>,
) -> (Arc<TaskClient>, Uuid) {
    let user_id = Uuid::new_v4();
    let client = TaskClient::with_parts(config, Arc::new(RefreshCoordinator::new()), listener)
        .expect("client should build");
    client
        .set_session(Session {
            access_token: OLD_ACCESS.to_string(),
            refresh_token: OLD_REFRESH.to_string(),
            user_id,
        })
        .await;
    (Arc::new(client), user_id)
}

/// `/projects` rejects the old token and accepts the new one.
async fn mount_projects(server: &MockServer, user_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", format!("Bearer {}", OLD_ACCESS).as_str()))
        .respond_with(unauthorized())
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("authorization", format!("Bearer {}", NEW_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([project_json(user_id, "Inbox")])))
        .mount(server)
        .await;
}

// =============================================================================
// Client Creation Tests
// =============================================================================

mod client_creation {
    use super::*;

    #[test]
    fn test_empty_url_rejected() {
        match TaskClient::new(ClientConfig::new("")) {
            Err(ClientError::InvalidUrl(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected InvalidUrl error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(matches!(
            TaskClient::new(ClientConfig::new("ftp://example.com")),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unauthenticated_request_requires_auth() {
        let client = TaskClient::new(ClientConfig::new("http://localhost:9")).unwrap();
        assert!(matches!(
            client.list_projects().await,
            Err(ClientError::AuthRequired)
        ));
    }
}

// =============================================================================
// Login Tests
// =============================================================================

mod login {
    use super::*;

    #[tokio::test]
    async fn test_login_stores_session() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_partial_json(json!({ "email": "ada@example.com" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_pair(user_id, NEW_ACCESS, NEW_REFRESH)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TaskClient::new(ClientConfig::new(server.uri())).unwrap();
        let pair = client.login("ada@example.com", "password123").await.unwrap();

        assert_eq!(pair.user_id, user_id);
        assert_eq!(
            client.session().await,
            Some(Session {
                access_token: NEW_ACCESS.to_string(),
                refresh_token: NEW_REFRESH.to_string(),
                user_id,
            })
        );
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let client = TaskClient::new(ClientConfig::new(server.uri())).unwrap();
        match client.login("ada@example.com", "wrong").await {
            Err(ClientError::AuthFailed(msg)) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("Expected AuthFailed, got {:?}", other),
        }
        assert!(!client.is_authenticated().await);
    }
}

// =============================================================================
// Token Refresh Tests
// =============================================================================

mod token_refresh {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, user_id) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;

        mount_projects(&server, user_id).await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_partial_json(json!({ "refresh_token": OLD_REFRESH })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_pair(user_id, NEW_ACCESS, NEW_REFRESH))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.list_projects().await })
            })
            .collect();

        for handle in handles {
            let projects = handle.await.unwrap().expect("request should succeed after refresh");
            assert_eq!(projects.len(), 1);
            assert_eq!(projects[0].name, "Inbox");
        }

        let session = client.session().await.unwrap();
        assert_eq!(session.access_token, NEW_ACCESS);
        assert_eq!(session.refresh_token, NEW_REFRESH);
        assert_eq!(listener.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_fails_all_and_logs_out_once() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, user_id) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;

        mount_projects(&server, user_id).await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "error": "Invalid token" }))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.list_projects().await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(
                matches!(
                    result,
                    Err(ClientError::TokenRefreshFailed(_)) | Err(ClientError::AuthRequired)
                ),
                "unexpected result: {:?}",
                result
            );
        }

        assert!(client.session().await.is_none());
        assert_eq!(listener.count(), 1);
    }

    #[tokio::test]
    async fn test_request_retried_at_most_once() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, user_id) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;

        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(unauthorized())
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_pair(user_id, NEW_ACCESS, NEW_REFRESH)),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert!(matches!(
            client.list_projects().await,
            Err(ClientError::AuthRequired)
        ));
        assert_eq!(listener.count(), 0);
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, _) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;
        let project_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path(format!("/projects/{}", project_id).as_str()))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "error": "You do not own this project" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        match client.get_project(project_id).await {
            Err(ClientError::ServerError { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "You do not own this project");
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }
        assert_eq!(client.session().await.unwrap().access_token, OLD_ACCESS);
    }

    #[tokio::test]
    async fn test_refresh_timeout_counts_as_failure() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let config =
            ClientConfig::new(server.uri()).with_refresh_timeout(Duration::from_millis(100));
        let (client, user_id) = logged_in_client(config, listener.clone()).await;

        mount_projects(&server, user_id).await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_pair(user_id, NEW_ACCESS, NEW_REFRESH))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        assert!(matches!(
            client.list_projects().await,
            Err(ClientError::TokenRefreshFailed(_))
        ));
        assert!(client.session().await.is_none());
        assert_eq!(listener.count(), 1);
    }

    #[tokio::test]
    async fn test_stale_401_uses_already_refreshed_token() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, user_id) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;

        // The session is replaced while the old-token request is in flight.
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", format!("Bearer {}", OLD_ACCESS).as_str()))
            .respond_with(unauthorized().set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", format!("Bearer {}", NEW_ACCESS).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = {
            let client = client.clone();
            tokio::spawn(async move { client.list_projects().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        client
            .set_session(Session {
                access_token: NEW_ACCESS.to_string(),
                refresh_token: NEW_REFRESH.to_string(),
                user_id,
            })
            .await;

        let projects = request.await.unwrap().unwrap();
        assert!(projects.is_empty());
    }
}

// =============================================================================
// Logout Tests
// =============================================================================

mod logout {
    use super::*;

    #[tokio::test]
    async fn test_logout_clears_session_without_notifying() {
        let server = MockServer::start().await;
        let listener = Arc::new(CountingListener::default());
        let (client, _) =
            logged_in_client(ClientConfig::new(server.uri()), listener.clone()).await;

        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("authorization", format!("Bearer {}", OLD_ACCESS).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Logged out" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client.logout().await.unwrap();

        assert!(!client.is_authenticated().await);
        assert_eq!(listener.count(), 0);
    }
}

//! REST API tests — a live server on an ephemeral port, exercised through
//! the same `ApiClient` gateway the UI uses.

use std::sync::Arc;

use taskdeck::client::ApiClient;
use taskdeck::config::AppConfig;
use taskdeck::rest;
use taskdeck::AppContext;

/// Start a server on an ephemeral port; returns the gateway pointed at it.
/// The TempDir must outlive the test so the database file sticks around.
async fn spawn_server() -> (ApiClient, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig::new(Some(0), Some(dir.path().to_path_buf()), None, None);
    let ctx = Arc::new(AppContext::init(config).await.expect("context"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    (ApiClient::new(format!("http://{addr}")), dir)
}

#[tokio::test]
async fn health_endpoint_is_reachable() {
    let (client, _dir) = spawn_server().await;
    assert!(client.is_reachable().await);
}

#[tokio::test]
async fn crud_lifecycle_over_http() {
    let (client, _dir) = spawn_server().await;

    assert!(client.list_tasks().await.unwrap().is_empty());

    let created = client.add_task("Buy milk", "2024-06-01").await.unwrap();
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.task_date, "2024-06-01");
    assert!(!created.completed);

    let tasks = client.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0], created);

    let toggled = client.toggle_task(created.id).await.unwrap().unwrap();
    assert!(toggled.completed);
    let toggled_back = client.toggle_task(created.id).await.unwrap().unwrap();
    assert!(!toggled_back.completed);

    let resp = client.delete_task(created.id).await.unwrap();
    assert_eq!(resp.message, "Deleted successfully");
    assert!(client.list_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn newest_task_is_listed_first() {
    let (client, _dir) = spawn_server().await;

    client.add_task("older", "2024-06-01").await.unwrap();
    let newer = client.add_task("newer", "2024-06-02").await.unwrap();

    let tasks = client.list_tasks().await.unwrap();
    assert_eq!(tasks[0], newer);
}

#[tokio::test]
async fn toggle_on_missing_id_returns_null_body() {
    let (client, _dir) = spawn_server().await;
    assert!(client.toggle_task(12345).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_on_missing_id_still_confirms() {
    let (client, _dir) = spawn_server().await;
    let resp = client.delete_task(12345).await.unwrap();
    assert_eq!(resp.message, "Deleted successfully");
}

#[tokio::test]
async fn invalid_date_surfaces_as_server_error() {
    let (client, _dir) = spawn_server().await;
    // The gateway propagates the 500 unmodified.
    assert!(client.add_task("bad", "not-a-date").await.is_err());
    assert!(client.list_tasks().await.unwrap().is_empty());
}

mod common;

use axum::http::StatusCode;
use std::sync::Arc;
use url_redirector::infrastructure::persistence::InMemoryShortUrlRepository;

#[tokio::test]
async fn test_health_endpoint_success() {
    let repository = Arc::new(InMemoryShortUrlRepository::new());
    let (state, _rx) = common::create_test_state(repository, common::settings(false, false));
    let server = common::create_test_server(state);

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["store"]["status"], "ok");
    assert_eq!(json["checks"]["hit_queue"]["status"], "ok");
    assert_eq!(json["checks"]["cache"]["status"], "ok");
}

#[tokio::test]
async fn test_health_endpoint_structure() {
    let repository = Arc::new(InMemoryShortUrlRepository::new());
    let (state, _rx) = common::create_test_state(repository, common::settings(false, false));
    let server = common::create_test_server(state);

    let response = server.get("/health").await;

    let json = response.json::<serde_json::Value>();

    assert!(json.get("status").is_some());
    assert!(json.get("version").is_some());
    assert!(json.get("checks").is_some());
    assert!(json["checks"].get("store").is_some());
    assert!(json["checks"].get("hit_queue").is_some());
    assert!(json["checks"].get("cache").is_some());
}

#[tokio::test]
async fn test_health_degraded_when_hit_worker_stops() {
    let repository = Arc::new(InMemoryShortUrlRepository::new());
    let (state, rx) = common::create_test_state(repository, common::settings(false, false));
    drop(rx);
    let server = common::create_test_server(state);

    let response = server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["hit_queue"]["status"], "error");
    assert_eq!(json["checks"]["store"]["status"], "ok");
}

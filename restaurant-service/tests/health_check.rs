//! Integration tests for the operational endpoints.

mod common;

use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "restaurant-service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_reports_catalog_and_provider() {
    let app = TestApp::spawn().await;

    let response = app.get("/ready").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ready");
    assert_eq!(body["restaurants"], 13);
    assert_eq!(body["provider"], "mock");
}

#[tokio::test]
async fn readiness_fails_without_api_key() {
    let app = TestApp::spawn_with(&[("ASSISTANT_PROVIDER", "anthropic")]).await;

    let response = app.get("/ready").await;
    assert_eq!(response.status().as_u16(), 503);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["provider"], "anthropic");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn missing_dataset_fails_startup() {
    use restaurant_service::config::RestaurantConfig;
    use restaurant_service::startup::Application;
    use service_core::config::Config as CoreConfig;

    let common = CoreConfig {
        port: 0,
        log_level: "info".to_string(),
    };
    let config = RestaurantConfig::from_lookup(common, |key| match key {
        "ASSISTANT_PROVIDER" => Some("mock".to_string()),
        "RESTAURANT_DATA_PATH" => Some("does/not/exist.json".to_string()),
        _ => None,
    })
    .unwrap();

    assert!(Application::build(config).await.is_err());
}

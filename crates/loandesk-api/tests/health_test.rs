//! Health endpoint tests.

mod helpers;

use helpers::{setup_test_app, setup_test_app_with, TestOptions};
use serde_json::Value;

#[tokio::test]
async fn test_health_reports_pipeline_configuration() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert_eq!(body["ocr_engines"][0], "fake_ocr");
    assert_eq!(body["structuring"], true);
}

#[tokio::test]
async fn test_structuring_disabled_without_llm() {
    let app = setup_test_app_with(TestOptions {
        llm: None,
        ..TestOptions::default()
    })
    .await;

    let body: Value = app.server.get("/health").await.json();
    assert_eq!(body["structuring"], false);
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let app = setup_test_app().await;

    app.server.get("/health/live").await.assert_status_ok();

    let ready = app.server.get("/health/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["status"], "ready");
}

#[tokio::test]
async fn test_openapi_document_lists_upload_route() {
    let app = setup_test_app().await;

    let spec: Value = app.server.get("/api/openapi.json").await.json();
    assert!(spec["paths"]["/api/admin-verify/upload"].is_object());
}

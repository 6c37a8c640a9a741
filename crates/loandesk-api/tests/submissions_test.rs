//! Submission API tests.
//!
//! Run with: `cargo test -p loandesk-api --test submissions_test`

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::fakes::{FakeOcr, PAYSLIP_TEXT};
use helpers::{scratch_is_empty, setup_test_app, setup_test_app_with, TestOptions, BASE_URL};
use loandesk_db::InMemorySubmissionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const UPLOAD: &str = "/api/admin-verify/upload";

fn applicant_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("userId", "user-42")
        .add_text("loanType", "home")
        .add_text("fullName", "Jane Roe")
        .add_text("permanentAddress", "1 Main St")
        .add_text("currentAddress", "2 High St")
}

fn file(name: &str, mime: &str) -> Part {
    Part::bytes(b"not-really-an-image".to_vec())
        .file_name(name)
        .mime_type(mime)
}

#[tokio::test]
async fn test_single_image_upload_returns_one_spreadsheet_url() {
    let app = setup_test_app().await;
    let mut admin = app.state.events.subscribe();

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Documents processed successfully");

    let urls = body["uploadedUrls"].as_array().unwrap();
    assert_eq!(urls.len(), 1);
    let url = urls[0].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/excel/", BASE_URL)));
    assert!(url.ends_with(".xlsx"));

    let rows = app.store.submissions();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].secure_url, vec![url.to_string()]);
    assert_eq!(rows[0].full_name, "Jane Roe");
    assert_eq!(body["submissionId"], rows[0].id.to_string());

    assert_eq!(app.store.spreadsheets().len(), 1);
    assert_eq!(app.store.notifications().len(), 1);

    let event = admin.try_recv().unwrap();
    assert_eq!(event.event, "new-document-submission");
    assert_eq!(event.data.user_id, "user-42");

    assert!(scratch_is_empty(&app.scratch_dir));
}

#[tokio::test]
async fn test_generated_spreadsheet_is_served_from_local_storage() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.png", "image/png")))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let url = body["uploadedUrls"][0].as_str().unwrap();
    let path = url.trim_start_matches("http://localhost:8000");

    let download = app.server.get(path).await;
    download.assert_status_ok();
    // xlsx files are zip archives
    assert!(download.as_bytes().starts_with(b"PK"));
}

#[tokio::test]
async fn test_pdf_and_images_in_one_submission() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(
            applicant_form()
                .add_part("files", file("statement.pdf", "application/pdf"))
                .add_part("files", file("licence.jpeg", "image/jpeg")),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(app.store.submissions().len(), 1);
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let app = setup_test_app().await;

    let response = app.server.post(UPLOAD).multipart(applicant_form()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No files to upload");
    assert!(app.store.submissions().is_empty());
}

#[tokio::test]
async fn test_blank_file_input_counts_as_no_files() {
    let app = setup_test_app().await;

    let blank = Part::bytes(Vec::<u8>::new())
        .file_name("")
        .mime_type("application/octet-stream");
    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", blank))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No files to upload");
    assert!(app.store.submissions().is_empty());
}

#[tokio::test]
async fn test_missing_applicant_fields_are_rejected() {
    let app = setup_test_app().await;

    let form = MultipartForm::new()
        .add_text("loanType", "car")
        .add_part("files", file("payslip.jpg", "image/jpeg"));
    let response = app.server.post(UPLOAD).multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing required fields");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("userId"));
    assert!(message.contains("fullName"));
}

#[tokio::test]
async fn test_unsupported_file_type_is_415() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("notes.docx", "application/msword")))
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(app.store.submissions().is_empty());
    assert!(scratch_is_empty(&app.scratch_dir));
}

#[tokio::test]
async fn test_oversized_file_is_413() {
    let app = setup_test_app_with(TestOptions {
        max_file_size_bytes: 8,
        ..TestOptions::default()
    })
    .await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_slow_pipeline_times_out_with_504() {
    let app = setup_test_app_with(TestOptions {
        ocr: vec![Arc::new(FakeOcr::slow(PAYSLIP_TEXT, Duration::from_secs(5)))],
        pipeline_timeout_seconds: 1,
        ..TestOptions::default()
    })
    .await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
        .await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    assert!(app.store.submissions().is_empty());
    assert!(scratch_is_empty(&app.scratch_dir));
}

#[tokio::test]
async fn test_notification_failure_still_succeeds() {
    let app = setup_test_app_with(TestOptions {
        store: InMemorySubmissionStore::with_failing_notifications(),
        ..TestOptions::default()
    })
    .await;

    let response = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
        .await;

    response.assert_status_ok();
    assert_eq!(app.store.submissions().len(), 1);
    assert!(app.store.notifications().is_empty());
}

#[tokio::test]
async fn test_review_flow() {
    let app = setup_test_app().await;

    let upload = app
        .server
        .post(UPLOAD)
        .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
        .await;
    upload.assert_status_ok();
    let id = upload.json::<Value>()["submissionId"]
        .as_str()
        .unwrap()
        .to_string();

    let listed = app
        .server
        .get("/api/admin-verify/submissions")
        .add_query_param("status", "pending")
        .await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 1);

    let fetched = app
        .server
        .get(&format!("/api/admin-verify/submissions/{}", id))
        .await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["status"], "pending");

    let skipped = app
        .server
        .patch(&format!("/api/admin-verify/submissions/{}/status", id))
        .json(&json!({ "status": "approved" }))
        .await;
    skipped.assert_status(StatusCode::CONFLICT);

    let reviewing = app
        .server
        .patch(&format!("/api/admin-verify/submissions/{}/status", id))
        .json(&json!({ "status": "under_review" }))
        .await;
    reviewing.assert_status_ok();
    assert_eq!(reviewing.json::<Value>()["status"], "under_review");

    let bogus = app
        .server
        .patch(&format!("/api/admin-verify/submissions/{}/status", id))
        .json(&json!({ "status": "archived" }))
        .await;
    bogus.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_submission_is_404() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&format!(
            "/api/admin-verify/submissions/{}",
            uuid::Uuid::new_v4()
        ))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spreadsheet_and_notification_listings() {
    let app = setup_test_app().await;

    for _ in 0..2 {
        app.server
            .post(UPLOAD)
            .multipart(applicant_form().add_part("files", file("payslip.jpg", "image/jpeg")))
            .await
            .assert_status_ok();
    }

    let sheets = app.server.get("/api/generate-docs/spreadsheets").await;
    sheets.assert_status_ok();
    let body: Value = sheets.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let notifications = app
        .server
        .get("/api/admin/notifications")
        .add_query_param("limit", 1)
        .await;
    notifications.assert_status_ok();
    assert_eq!(notifications.json::<Value>().as_array().unwrap().len(), 1);
}

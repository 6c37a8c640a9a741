//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use loandesk_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loandesk API",
        version = "0.1.0",
        description = "Loan document intake: OCR, structuring and spreadsheet export of applicant documents, plus the admin review surface."
    ),
    paths(
        handlers::upload::upload_documents,
        handlers::submission_get::list_submissions,
        handlers::submission_get::get_submission,
        handlers::submission_status::update_submission_status,
        handlers::spreadsheets::list_spreadsheets,
        handlers::notifications::list_notifications,
    ),
    components(schemas(
        ErrorResponse,
        handlers::upload::UploadResponse,
        handlers::submission_status::UpdateStatusRequest,
        handlers::spreadsheets::SpreadsheetListResponse,
        models::SubmissionRecord,
        models::SubmissionStatus,
        models::ApplicantDetails,
        models::GeneratedSpreadsheet,
        models::AdminNotification,
        models::NotificationEvent,
    )),
    tags(
        (name = "submissions", description = "Document submissions and review status"),
        (name = "spreadsheets", description = "Generated spreadsheets"),
        (name = "admin", description = "Admin notifications")
    )
)]
pub struct ApiDoc;

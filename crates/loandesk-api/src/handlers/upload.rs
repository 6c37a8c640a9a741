use crate::error::{error_body, is_production_env, log_error, status_of, ErrorResponse};
use crate::state::AppState;
use crate::utils::upload::{read_submission_form, UploadLimits};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use loandesk_core::{AppError, ErrorMetadata};
use loandesk_services::SubmissionRequest;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub const PROCESSING_FAILED: &str = "Failed to process documents";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub uploaded_urls: Vec<String>,
    pub submission_id: Uuid,
}

/// Failure modes of the upload endpoint, each with its own body shape.
#[derive(Debug)]
pub enum UploadError {
    MissingFields(Vec<&'static str>),
    Failed(AppError),
}

impl From<AppError> for UploadError {
    fn from(err: AppError) -> Self {
        UploadError::Failed(err)
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                Json(
                    ErrorResponse::new("Missing required fields")
                        .with_message(format!("Required: {}", fields.join(", "))),
                ),
            )
                .into_response(),
            UploadError::Failed(err) => {
                log_error(&err);
                let status = status_of(&err);
                let is_production = is_production_env();
                let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    let message = if is_production {
                        err.client_message()
                    } else {
                        err.detailed_message()
                    };
                    ErrorResponse::new(PROCESSING_FAILED).with_message(message)
                } else {
                    error_body(&err, is_production)
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Accept loan documents, run them through the pipeline and return the
/// generated spreadsheet URL.
#[utoipa::path(
    post,
    path = "/api/admin-verify/upload",
    tag = "submissions",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Documents processed", body = UploadResponse),
        (status = 400, description = "No files or missing applicant fields", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported file type", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
        (status = 504, description = "Processing timed out", body = ErrorResponse)
    )
)]
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    let pipeline_config = state.config.pipeline();
    let limits = UploadLimits {
        max_file_size: pipeline_config.max_file_size_bytes,
        max_files: pipeline_config.max_files_per_submission,
    };

    let form = read_submission_form(multipart, limits).await?;

    if form.files.is_empty() {
        return Err(AppError::InvalidInput("No files to upload".to_string()).into());
    }
    let missing = form.missing_fields();
    if !missing.is_empty() {
        return Err(UploadError::MissingFields(missing));
    }

    tracing::info!(
        user_id = %form.applicant.user_id,
        files = form.files.len(),
        "Document submission received"
    );

    let outcome = state
        .pipeline
        .process(SubmissionRequest {
            applicant: form.applicant,
            files: form.files,
            field_hints: Vec::new(),
        })
        .await?;

    Ok(Json(UploadResponse {
        message: "Documents processed successfully".to_string(),
        uploaded_urls: outcome.uploaded_urls,
        submission_id: outcome.submission.id,
    }))
}

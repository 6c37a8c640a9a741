use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use loandesk_core::models::{SubmissionRecord, SubmissionStatus};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: SubmissionStatus,
}

#[utoipa::path(
    patch,
    path = "/api/admin-verify/submissions/{id}/status",
    tag = "submissions",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = SubmissionRecord),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    )
)]
pub async fn update_submission_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let updated = state.store.update_status(id, request.status).await?;

    tracing::info!(submission_id = %id, status = %updated.status, "Submission status updated");
    Ok(Json(updated))
}

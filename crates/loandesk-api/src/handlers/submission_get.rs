use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use loandesk_core::models::{SubmissionRecord, SubmissionStatus};
use loandesk_core::AppError;
use loandesk_db::SubmissionFilter;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubmissionListQuery {
    /// Only submissions in this status.
    pub status: Option<SubmissionStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[utoipa::path(
    get,
    path = "/api/admin-verify/submissions",
    tag = "submissions",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Submissions, newest first", body = Vec<SubmissionRecord>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let filter = SubmissionFilter {
        status: query.status,
        limit: query.limit.clamp(1, 200),
        offset: query.offset.max(0),
    };

    let submissions = state.store.list_submissions(filter).await?;
    Ok(Json(submissions))
}

#[utoipa::path(
    get,
    path = "/api/admin-verify/submissions/{id}",
    tag = "submissions",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission found", body = SubmissionRecord),
        (status = 404, description = "Submission not found", body = ErrorResponse)
    )
)]
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = state
        .store
        .get_submission(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

    Ok(Json(submission))
}

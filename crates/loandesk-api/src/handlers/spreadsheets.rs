use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use loandesk_core::models::GeneratedSpreadsheet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpreadsheetListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpreadsheetListResponse {
    pub success: bool,
    pub data: Vec<GeneratedSpreadsheet>,
    pub count: usize,
}

/// Registry of generated spreadsheets, newest first.
#[utoipa::path(
    get,
    path = "/api/generate-docs/spreadsheets",
    tag = "spreadsheets",
    params(SpreadsheetListQuery),
    responses(
        (status = 200, description = "Generated spreadsheets", body = SpreadsheetListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_spreadsheets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpreadsheetListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let data = state
        .store
        .list_spreadsheets(query.limit.clamp(1, 500))
        .await?;

    Ok(Json(SpreadsheetListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

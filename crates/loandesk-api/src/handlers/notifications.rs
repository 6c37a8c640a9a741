use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use loandesk_core::models::AdminNotification;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    tag = "admin",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Recent admin notifications", body = Vec<AdminNotification>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notifications = state
        .store
        .list_notifications(query.limit.clamp(1, 200))
        .await?;
    Ok(Json(notifications))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ApplicantDetails;

/// Realtime event name for a completed submission.
pub const NEW_SUBMISSION_EVENT: &str = "new-document-submission";

/// Channel that admin dashboards listen on.
pub const ADMIN_CHANNEL: &str = "admins";

/// Payload broadcast to the admin channel after a submission is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub user_id: String,
    pub loan_type: String,
    pub full_name: String,
    pub permanent_address: String,
    pub current_address: String,
    pub files: Vec<String>,
}

impl NotificationEvent {
    pub fn new_submission(applicant: &ApplicantDetails, files: Vec<String>) -> Self {
        Self {
            user_id: applicant.user_id.clone(),
            loan_type: applicant.loan_type.clone(),
            full_name: applicant.full_name.clone(),
            permanent_address: applicant.permanent_address.clone(),
            current_address: applicant.current_address.clone(),
            files,
        }
    }

    pub fn title(&self) -> String {
        "New document submission".to_string()
    }

    pub fn message(&self) -> String {
        format!(
            "{} submitted {} document(s) for a {} loan",
            self.full_name,
            self.files.len(),
            if self.loan_type.is_empty() {
                "unspecified"
            } else {
                self.loan_type.as_str()
            }
        )
    }
}

/// Logged copy of a notification sent to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AdminNotification {
    pub id: Uuid,
    pub submission_id: Option<Uuid>,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Registry entry for an uploaded spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSpreadsheet {
    pub id: Uuid,
    pub submission_id: Option<Uuid>,
    pub file_name: String,
    pub url: String,
    pub row_count: i32,
    pub created_at: DateTime<Utc>,
}

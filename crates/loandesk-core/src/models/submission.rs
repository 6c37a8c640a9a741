use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Review lifecycle of a loan document submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "submission_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    DocsRequired,
}

impl SubmissionStatus {
    /// `pending -> under_review -> approved | rejected | docs_required`, and
    /// `docs_required -> under_review` once new documents arrive.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Pending, UnderReview)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (UnderReview, DocsRequired)
                | (DocsRequired, UnderReview)
        )
    }
}

impl Display for SubmissionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::UnderReview => write!(f, "under_review"),
            SubmissionStatus::Approved => write!(f, "approved"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
            SubmissionStatus::DocsRequired => write!(f, "docs_required"),
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "under_review" => Ok(SubmissionStatus::UnderReview),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "docs_required" => Ok(SubmissionStatus::DocsRequired),
            _ => Err(anyhow::anyhow!("Invalid submission status: {}", s)),
        }
    }
}

/// Applicant details submitted alongside the documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    pub user_id: String,
    pub loan_type: String,
    pub full_name: String,
    pub permanent_address: String,
    pub current_address: String,
}

/// Persisted submission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub loan_type: String,
    pub full_name: String,
    pub permanent_address: String,
    pub current_address: String,
    pub secure_url: Vec<String>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for inserting a submission; id and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub id: Uuid,
    pub applicant: ApplicantDetails,
    pub secure_url: Vec<String>,
}

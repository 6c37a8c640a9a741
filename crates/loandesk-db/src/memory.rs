//! In-memory [`SubmissionStore`] for tests without a database.

use async_trait::async_trait;
use chrono::Utc;
use loandesk_core::{
    models::{
        AdminNotification, GeneratedSpreadsheet, NewSubmission, SubmissionRecord, SubmissionStatus,
    },
    AppError,
};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::db::SubmissionFilter;
use crate::store::{NewNotification, NewSpreadsheet, SubmissionStore};

#[derive(Default)]
struct Tables {
    submissions: Vec<SubmissionRecord>,
    spreadsheets: Vec<GeneratedSpreadsheet>,
    notifications: Vec<AdminNotification>,
}

#[derive(Clone, Default)]
pub struct InMemorySubmissionStore {
    tables: Arc<Mutex<Tables>>,
    fail_notifications: bool,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose notification log always errors.
    pub fn with_failing_notifications() -> Self {
        Self {
            fail_notifications: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("in-memory store poisoned".to_string()))
    }

    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.lock().map(|t| t.submissions.clone()).unwrap_or_default()
    }

    pub fn spreadsheets(&self) -> Vec<GeneratedSpreadsheet> {
        self.lock().map(|t| t.spreadsheets.clone()).unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<AdminNotification> {
        self.lock().map(|t| t.notifications.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn create_submission(
        &self,
        submission: NewSubmission,
        spreadsheet: NewSpreadsheet,
    ) -> Result<SubmissionRecord, AppError> {
        let now = Utc::now();
        let record = SubmissionRecord {
            id: submission.id,
            user_id: submission.applicant.user_id,
            loan_type: submission.applicant.loan_type,
            full_name: submission.applicant.full_name,
            permanent_address: submission.applicant.permanent_address,
            current_address: submission.applicant.current_address,
            secure_url: submission.secure_url,
            status: SubmissionStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.lock()?;
        tables.submissions.push(record.clone());
        tables.spreadsheets.push(GeneratedSpreadsheet {
            id: Uuid::new_v4(),
            submission_id: Some(record.id),
            file_name: spreadsheet.file_name,
            url: spreadsheet.url,
            row_count: spreadsheet.row_count,
            created_at: now,
        });
        Ok(record)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<SubmissionRecord>, AppError> {
        Ok(self
            .lock()?
            .submissions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .submissions
            .iter()
            .rev()
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        next: SubmissionStatus,
    ) -> Result<SubmissionRecord, AppError> {
        let mut tables = self.lock()?;
        let record = tables
            .submissions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        if !record.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: record.status,
                to: next,
            });
        }

        record.status = next;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list_spreadsheets(&self, limit: i64) -> Result<Vec<GeneratedSpreadsheet>, AppError> {
        Ok(self
            .lock()?
            .spreadsheets
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn log_notification(
        &self,
        notification: NewNotification,
    ) -> Result<AdminNotification, AppError> {
        if self.fail_notifications {
            return Err(AppError::Internal("notification log unavailable".to_string()));
        }

        let entry = AdminNotification {
            id: Uuid::new_v4(),
            submission_id: notification.submission_id,
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            is_read: false,
            created_at: Utc::now(),
        };
        self.lock()?.notifications.push(entry.clone());
        Ok(entry)
    }

    async fn list_notifications(&self, limit: i64) -> Result<Vec<AdminNotification>, AppError> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

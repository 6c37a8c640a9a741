use loandesk_core::{
    models::{NewSubmission, SubmissionRecord, SubmissionStatus},
    AppError,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const SUBMISSION_COLUMNS: &str = "id, user_id, loan_type, full_name, permanent_address, \
     current_address, secure_url, status, created_at, updated_at";

/// Listing filter for the admin dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for loan document submissions
#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a submission inside an open transaction.
    #[tracing::instrument(skip(self, tx, submission), fields(db.table = "submissions", db.operation = "insert", db.record_id = %submission.id))]
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        submission: &NewSubmission,
    ) -> Result<SubmissionRecord, AppError> {
        let applicant = &submission.applicant;
        let record = sqlx::query_as::<Postgres, SubmissionRecord>(&format!(
            r#"
            INSERT INTO submissions
                (id, user_id, loan_type, full_name, permanent_address, current_address, secure_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(submission.id)
        .bind(&applicant.user_id)
        .bind(&applicant.loan_type)
        .bind(&applicant.full_name)
        .bind(&applicant.permanent_address)
        .bind(&applicant.current_address)
        .bind(&submission.secure_url)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<SubmissionRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Newest first.
    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select"))]
    pub async fn list(&self, filter: SubmissionFilter) -> Result<Vec<SubmissionRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, SubmissionRecord>(&format!(
            r#"
            SELECT {}
            FROM submissions
            WHERE ($1::submission_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Move a submission to `next`, validating the transition against the
    /// current row under a row lock.
    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "update", db.record_id = %id))]
    pub async fn update_status(
        &self,
        id: Uuid,
        next: SubmissionStatus,
    ) -> Result<SubmissionRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<Postgres, SubmissionStatus>(
            "SELECT status FROM submissions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        if !current.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        let record = sqlx::query_as::<Postgres, SubmissionRecord>(&format!(
            "UPDATE submissions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            submission_id = %id,
            from = %current,
            to = %next,
            "Submission status updated"
        );

        Ok(record)
    }
}

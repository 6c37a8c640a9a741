use loandesk_core::{models::GeneratedSpreadsheet, AppError};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Registry of spreadsheets uploaded by the pipeline
#[derive(Clone)]
pub struct SpreadsheetRepository {
    pool: PgPool,
}

impl SpreadsheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "generated_spreadsheets", db.operation = "insert"))]
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        submission_id: Uuid,
        file_name: &str,
        url: &str,
        row_count: i32,
    ) -> Result<GeneratedSpreadsheet, AppError> {
        let entry = sqlx::query_as::<Postgres, GeneratedSpreadsheet>(
            r#"
            INSERT INTO generated_spreadsheets (submission_id, file_name, url, row_count)
            VALUES ($1, $2, $3, $4)
            RETURNING id, submission_id, file_name, url, row_count, created_at
            "#,
        )
        .bind(submission_id)
        .bind(file_name)
        .bind(url)
        .bind(row_count)
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    #[tracing::instrument(skip(self), fields(db.table = "generated_spreadsheets", db.operation = "select"))]
    pub async fn list(&self, limit: i64) -> Result<Vec<GeneratedSpreadsheet>, AppError> {
        let entries = sqlx::query_as::<Postgres, GeneratedSpreadsheet>(
            r#"
            SELECT id, submission_id, file_name, url, row_count, created_at
            FROM generated_spreadsheets
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

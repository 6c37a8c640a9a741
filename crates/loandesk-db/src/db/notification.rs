use loandesk_core::{models::AdminNotification, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Log of notifications pushed to the admin channel
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, title, message), fields(db.table = "admin_notifications", db.operation = "insert"))]
    pub async fn insert(
        &self,
        submission_id: Option<Uuid>,
        user_id: &str,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<AdminNotification, AppError> {
        let notification = sqlx::query_as::<Postgres, AdminNotification>(
            r#"
            INSERT INTO admin_notifications (submission_id, user_id, title, message, kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, submission_id, user_id, title, message, kind, is_read, created_at
            "#,
        )
        .bind(submission_id)
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_notifications", db.operation = "select"))]
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<AdminNotification>, AppError> {
        let notifications = sqlx::query_as::<Postgres, AdminNotification>(
            r#"
            SELECT id, submission_id, user_id, title, message, kind, is_read, created_at
            FROM admin_notifications
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }
}

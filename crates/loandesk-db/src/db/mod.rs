//! Repository implementations, one per table.

pub mod notification;
pub mod spreadsheet;
pub mod submission;

pub use notification::NotificationRepository;
pub use spreadsheet::SpreadsheetRepository;
pub use submission::{SubmissionFilter, SubmissionRepository};

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::path::Path;

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

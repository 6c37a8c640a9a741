//! Database repositories for submissions, generated spreadsheets and the
//! admin notification log.

pub mod db;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod store;

pub use db::{
    run_migrations, NotificationRepository, SpreadsheetRepository, SubmissionFilter,
    SubmissionRepository,
};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySubmissionStore;
pub use store::{NewNotification, NewSpreadsheet, PgSubmissionStore, SubmissionStore};

pub mod admin_ws;
pub mod health;
pub mod notifications;
pub mod spreadsheets;
pub mod submission_get;
pub mod submission_status;
pub mod upload;

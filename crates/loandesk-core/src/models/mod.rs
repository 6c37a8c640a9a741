//! Data models for the intake pipeline
//!
//! Each sub-module covers one stage's data: OCR output, structured fields,
//! persisted submissions and admin notifications.

mod extraction;
mod notification;
mod spreadsheet;
mod structured;
mod submission;

pub use extraction::*;
pub use notification::*;
pub use spreadsheet::*;
pub use structured::*;
pub use submission::*;

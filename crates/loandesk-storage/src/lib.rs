//! Loandesk Storage Library
//!
//! Storage abstraction for generated artifacts, with local filesystem and S3
//! implementations.
//!
//! # Storage key format
//!
//! - **Spreadsheets**: `excel/{submission_id}/{file_name}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::spreadsheet_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use loandesk_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};

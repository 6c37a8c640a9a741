//! Loandesk Core Library
//!
//! Domain models, error types and configuration shared by every loandesk crate.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{Config, IntakeConfig, PipelineConfig, ProviderConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;

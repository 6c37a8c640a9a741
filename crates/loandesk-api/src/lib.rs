//! Loandesk API Library
//!
//! HTTP handlers, error rendering and application setup for the intake
//! service.

mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod utils;

pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;

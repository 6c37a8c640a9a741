//! HTTP error body
//!
//! `IntoResponse` for `AppError` lives in the api crate because of the orphan
//! rule; this is only the serialized shape.

use serde::Serialize;
use utoipa::ToSchema;

/// `{ "error": ..., "message": ... }`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

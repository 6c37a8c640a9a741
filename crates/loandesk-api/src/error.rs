//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and convert
//! domain errors with `?`; every error renders as `{ error, message }` with
//! the status from [`ErrorMetadata`].

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use loandesk_core::{AppError, ErrorMetadata, LogLevel};
use serde::de::DeserializeOwned;

pub use loandesk_infra::ErrorResponse;

/// Wrapper so `IntoResponse` can be implemented for the core error type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// `Json<T>` that rejects with our error body instead of axum's plain text.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

pub(crate) fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

pub(crate) fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

pub(crate) fn status_of(error: &AppError) -> StatusCode {
    StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Body for `error`: sensitive details only leave the process outside production.
pub(crate) fn error_body(error: &AppError, is_production: bool) -> ErrorResponse {
    let body = ErrorResponse::new(error.client_message());
    if error.is_sensitive() && !is_production {
        body.with_message(error.detailed_message())
    } else {
        body
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = &self.0;
        log_error(error);
        (status_of(error), Json(error_body(error, is_production_env()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let body = error_body(&AppError::InvalidInput("No files to upload".into()), true);
        assert_eq!(body.error, "No files to upload");
        assert!(body.message.is_none());
    }

    #[test]
    fn test_sensitive_details_hidden_in_production() {
        let err = AppError::Storage("bucket missing".into());

        let prod = error_body(&err, true);
        assert!(prod.message.is_none());
        assert!(!prod.error.contains("bucket"));

        let dev = error_body(&err, false);
        assert!(dev.message.unwrap().contains("bucket missing"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(&AppError::Timeout { seconds: 1 }), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_of(&AppError::UnsupportedFileType("x.docx".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(&AppError::PayloadTooLarge("big".into())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}

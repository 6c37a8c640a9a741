//! Loandesk Infrastructure Library
//!
//! Shared plumbing for the loandesk services: tracing initialization, the
//! request id middleware and the HTTP error body.

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

pub use error::ErrorResponse;

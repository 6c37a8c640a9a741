//! Application state shared by every handler.

use loandesk_core::Config;
use loandesk_db::SubmissionStore;
use loandesk_services::{AdminEventBus, SubmissionPipeline};
use loandesk_storage::Storage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SubmissionStore>,
    pub storage: Arc<dyn Storage>,
    pub pipeline: SubmissionPipeline,
    pub events: AdminEventBus,
    /// OCR engines in fallback order, as reported by the health check.
    pub ocr_engines: Vec<String>,
    /// Whether a language model is configured for structuring.
    pub structuring_enabled: bool,
}

//! Submission orchestration: the document pipeline and the admin event bus.

pub mod events;
pub mod pipeline;

pub use events::{AdminEvent, AdminEventBus};
pub use pipeline::{
    classify, sanitize_file_name, FileKind, PipelineStage, SubmissionOutcome, SubmissionPipeline,
    SubmissionRequest, UploadedFile, XLSX_CONTENT_TYPE,
};

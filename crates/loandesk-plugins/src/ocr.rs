//! OCR engine abstraction
//!
//! Every text-recognition backend (remote API or local binary) implements
//! [`OcrEngine`] so the extractor can walk a fallback chain without knowing
//! which providers are configured.

use anyhow::Result;
use async_trait::async_trait;
use loandesk_core::models::ExtractionMethod;
use std::fmt::Debug;

/// What kind of document the bytes hold. Decides API features, success
/// thresholds and attempt timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Classify by file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

/// Input handed to an engine.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub kind: DocumentKind,
}

impl OcrInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            kind,
        }
    }
}

/// A text-recognition backend.
#[async_trait]
pub trait OcrEngine: Send + Sync + Debug {
    /// Engine identifier used in logs
    fn name(&self) -> &str;

    /// Method recorded on results this engine produces
    fn method(&self) -> ExtractionMethod;

    /// Remote engines count against the process-wide call cap.
    fn is_remote(&self) -> bool;

    /// Whether to hand this engine the cleaned-up JPEG instead of the
    /// original bytes of the given type.
    fn wants_preprocessed_input(&self, _mime_type: &str) -> bool {
        false
    }

    fn supports(&self, kind: DocumentKind) -> bool;

    /// Whether the engine is configured and reachable. Unavailable engines
    /// are skipped, not treated as failures.
    async fn is_available(&self) -> bool;

    /// Recognize text. An empty string means the engine saw no text.
    async fn recognize(&self, input: &OcrInput) -> Result<String>;
}

/// MIME type for a file extension; unknown extensions are sent as JPEG.
pub fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "image/jpeg",
    }
}

//! External OCR and language-model clients
//!
//! Each provider is optional: engines without credentials or binaries report
//! themselves unavailable and the extractor skips them.

pub mod google_vision;
pub mod ocr;
pub mod openai;
pub mod tesseract;

pub use google_vision::GoogleVisionClient;
pub use ocr::{mime_type_for_extension, DocumentKind, OcrEngine, OcrInput};
pub use openai::{LlmClient, OpenAiClient};
pub use tesseract::TesseractEngine;

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which engine produced a piece of extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Vision,
    Tesseract,
    LlmVision,
    /// Every engine failed or was unavailable; the text is a diagnostic.
    None,
}

impl Display for ExtractionMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExtractionMethod::Vision => write!(f, "vision"),
            ExtractionMethod::Tesseract => write!(f, "tesseract"),
            ExtractionMethod::LlmVision => write!(f, "llm-vision"),
            ExtractionMethod::None => write!(f, "none"),
        }
    }
}

/// Text extracted from one source image or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractionResult {
    pub text: String,
    pub source_file: String,
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    pub fn new(text: impl Into<String>, source_file: impl Into<String>, method: ExtractionMethod) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
            method,
        }
    }

    /// Whether an OCR engine actually read this text.
    pub fn is_recognized(&self) -> bool {
        self.method != ExtractionMethod::None
    }
}

/// Joins extraction results into the single text blob stored as `raw_extracted_text`.
pub fn concatenate_text(results: &[ExtractionResult]) -> String {
    results
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_kebab_case() {
        let json = serde_json::to_string(&ExtractionMethod::LlmVision).unwrap();
        assert_eq!(json, "\"llm-vision\"");
        let parsed: ExtractionMethod = serde_json::from_str("\"tesseract\"").unwrap();
        assert_eq!(parsed, ExtractionMethod::Tesseract);
    }

    #[test]
    fn test_fallback_results_are_not_recognized() {
        let read = ExtractionResult::new("Payslip", "scan.jpg", ExtractionMethod::Tesseract);
        let fallback = ExtractionResult::new("Image processed (3 bytes).", "scan.jpg", ExtractionMethod::None);
        assert!(read.is_recognized());
        assert!(!fallback.is_recognized());
    }

    #[test]
    fn test_concatenate_skips_blank_entries() {
        let results = vec![
            ExtractionResult::new("Payslip March", "page1.png", ExtractionMethod::Vision),
            ExtractionResult::new("   ", "page2.png", ExtractionMethod::Vision),
            ExtractionResult::new("Bank statement\n", "scan.jpg", ExtractionMethod::Tesseract),
        ];
        assert_eq!(concatenate_text(&results), "Payslip March\n\nBank statement");
    }
}

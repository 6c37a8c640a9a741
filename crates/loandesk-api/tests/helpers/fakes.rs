//! Fake OCR engine, language model and rasterizer.

use async_trait::async_trait;
use loandesk_core::models::ExtractionMethod;
use loandesk_plugins::{DocumentKind, LlmClient, OcrEngine, OcrInput};
use loandesk_processing::{page_file_name, PdfRasterizer, RasterizeError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PAYSLIP_TEXT: &str = "ACME PTY LTD PAYSLIP\nEmployee: Jane Roe\nGross Salary: $5,000\nNet Salary: $3,900";
pub const PAYSLIP_JSON: &str =
    r#"{"document_type":"Payslip","employer_name":"ACME PTY LTD","gross_wage_per_month":5000}"#;

#[derive(Debug)]
pub struct FakeOcr {
    text: String,
    delay: Duration,
}

impl FakeOcr {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(text: &str, delay: Duration) -> Self {
        Self {
            text: text.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake_ocr"
    }
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Vision
    }
    fn is_remote(&self) -> bool {
        false
    }
    fn supports(&self, _kind: DocumentKind) -> bool {
        true
    }
    async fn is_available(&self) -> bool {
        true
    }
    async fn recognize(&self, _input: &OcrInput) -> anyhow::Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}

#[derive(Debug)]
pub struct FakeLlm {
    reply: String,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    fn model(&self) -> &str {
        "fake-model"
    }
    async fn complete_json(&self, _system_prompt: &str, _user_prompt: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}

pub struct FakeRasterizer {
    pub pages: usize,
}

#[async_trait]
impl PdfRasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: &Path, out: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
        std::fs::create_dir_all(out).map_err(|source| RasterizeError::OutputDir {
            path: out.to_path_buf(),
            source,
        })?;
        let mut pages = Vec::new();
        for n in 1..=self.pages {
            let path = out.join(page_file_name(n));
            std::fs::write(&path, b"png").map_err(|source| RasterizeError::OutputDir {
                path: path.clone(),
                source,
            })?;
            pages.push(path);
        }
        Ok(pages)
    }
}

//! Local OCR through the Tesseract command-line binary

use anyhow::{Context, Result};
use async_trait::async_trait;
use loandesk_core::models::ExtractionMethod;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::ocr::{DocumentKind, OcrEngine, OcrInput};

/// Tesseract engine. Image bytes are piped through stdin and text read
/// from stdout, so no intermediate files are written.
#[derive(Debug)]
pub struct TesseractEngine {
    binary: String,
    language: String,
    available: OnceCell<bool>,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            available: OnceCell::new(),
        }
    }

    async fn probe(&self) -> bool {
        let result = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match result {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::warn!(binary = %self.binary, code = ?status.code(), "Tesseract probe failed");
                false
            }
            Err(e) => {
                tracing::info!(binary = %self.binary, error = %e, "Tesseract not installed, local OCR disabled");
                false
            }
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Tesseract
    }

    fn is_remote(&self) -> bool {
        false
    }

    /// Tesseract reads better from cleaned-up images.
    fn wants_preprocessed_input(&self, _mime_type: &str) -> bool {
        true
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Image
    }

    /// Probed once per process.
    async fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe()).await
    }

    async fn recognize(&self, input: &OcrInput) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run tesseract (path='{}')", self.binary))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input.bytes)
                .await
                .context("Failed to pipe image into tesseract")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to read tesseract output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Tesseract OCR failed (exit code {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary", "eng");
        assert!(!tokio_test::block_on(engine.is_available()));
    }

    #[tokio::test]
    async fn test_missing_binary_recognize_errors() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary", "eng");
        let input = OcrInput::new(vec![1, 2, 3], "image/jpeg", DocumentKind::Image);
        let err = engine.recognize(&input).await.unwrap_err();
        assert!(err.to_string().contains("Failed to run tesseract"));
    }

    #[test]
    fn test_only_images_supported() {
        let engine = TesseractEngine::new("tesseract", "eng");
        assert!(engine.supports(DocumentKind::Image));
        assert!(!engine.supports(DocumentKind::Pdf));
        assert!(engine.wants_preprocessed_input("image/png"));
        assert!(!engine.is_remote());
    }
}

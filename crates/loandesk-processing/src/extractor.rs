//! Text extraction with an OCR fallback chain
//!
//! Engines are tried in order until one returns enough text. Unconfigured
//! engines are skipped, failing or slow ones fall through, and when nothing
//! works the result carries a diagnostic message instead of text. Extraction
//! never errors and never yields an empty string.

use loandesk_core::models::{ExtractionMethod, ExtractionResult};
use loandesk_plugins::{mime_type_for_extension, DocumentKind, OcrEngine, OcrInput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::preprocess::preprocess_for_ocr;

/// Trimmed text must be strictly longer than this to count as success.
pub const IMAGE_SUCCESS_THRESHOLD: usize = 50;
pub const PDF_SUCCESS_THRESHOLD: usize = 100;

pub const IMAGE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const PDF_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(45);

pub fn success_threshold(kind: DocumentKind) -> usize {
    match kind {
        DocumentKind::Image => IMAGE_SUCCESS_THRESHOLD,
        DocumentKind::Pdf => PDF_SUCCESS_THRESHOLD,
    }
}

pub fn fallback_message(size_bytes: usize) -> String {
    format!(
        "Image processed ({} bytes). OCR processing failed - please try again or process manually.",
        size_bytes
    )
}

/// Collapse runs of spaces and tabs, drop trailing whitespace on each line,
/// keep at most one blank line between paragraphs and trim the result.
pub fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let collapsed = line
            .split([' ', '\t', '\r', '\u{a0}'])
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    lines.join("\n").trim().to_string()
}

#[derive(Clone)]
pub struct TextExtractor {
    engines: Vec<Arc<dyn OcrEngine>>,
    remote_permits: Arc<Semaphore>,
    page_permits: Arc<Semaphore>,
    image_timeout: Duration,
    pdf_timeout: Duration,
}

impl TextExtractor {
    /// `engines` are tried in the given order. `remote_permits` is shared
    /// with every other component that calls a remote provider; `workers`
    /// bounds concurrent page extraction.
    pub fn new(
        engines: Vec<Arc<dyn OcrEngine>>,
        remote_permits: Arc<Semaphore>,
        workers: usize,
    ) -> Self {
        Self {
            engines,
            remote_permits,
            page_permits: Arc::new(Semaphore::new(workers.max(1))),
            image_timeout: IMAGE_ATTEMPT_TIMEOUT,
            pdf_timeout: PDF_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeouts(mut self, image: Duration, pdf: Duration) -> Self {
        self.image_timeout = image;
        self.pdf_timeout = pdf;
        self
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    fn attempt_timeout(&self, kind: DocumentKind) -> Duration {
        match kind {
            DocumentKind::Image => self.image_timeout,
            DocumentKind::Pdf => self.pdf_timeout,
        }
    }

    /// Extract text from one image or PDF.
    #[tracing::instrument(skip(self), fields(source_file))]
    pub async fn extract(&self, path: &Path) -> ExtractionResult {
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::Span::current().record("source_file", source_file.as_str());

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Source file not found");
                return ExtractionResult::new(
                    format!("Error: File not found: {}", source_file),
                    source_file,
                    ExtractionMethod::None,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read source file");
                return ExtractionResult::new(
                    format!("Error: Could not read file: {}", source_file),
                    source_file,
                    ExtractionMethod::None,
                );
            }
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let kind = DocumentKind::from_extension(extension);
        let original = OcrInput::new(data, mime_type_for_extension(extension), kind);
        let mut preprocessed: Option<OcrInput> = None;

        let threshold = success_threshold(kind);
        let timeout = self.attempt_timeout(kind);

        for engine in &self.engines {
            if !engine.supports(kind) {
                continue;
            }
            if !engine.is_available().await {
                tracing::debug!(engine = engine.name(), "Engine unavailable, skipping");
                continue;
            }

            let input = if engine.wants_preprocessed_input(&original.mime_type) {
                if preprocessed.is_none() {
                    preprocessed = Some(preprocess(&original).await);
                }
                preprocessed.as_ref().unwrap_or(&original)
            } else {
                &original
            };

            let start = Instant::now();
            let outcome = self.attempt(engine.as_ref(), input, timeout).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Some(text) => {
                    let text = normalize_whitespace(&text);
                    let chars = text.chars().count();
                    if chars > threshold {
                        tracing::info!(
                            engine = engine.name(),
                            method = %engine.method(),
                            chars,
                            duration_ms,
                            "Text extracted"
                        );
                        return ExtractionResult::new(text, source_file, engine.method());
                    }
                    tracing::debug!(
                        engine = engine.name(),
                        chars,
                        threshold,
                        duration_ms,
                        "Insufficient text, trying next engine"
                    );
                }
                None => {
                    tracing::debug!(engine = engine.name(), duration_ms, "Engine attempt failed");
                }
            }
        }

        tracing::warn!(size_bytes = original.bytes.len(), "All OCR engines failed");
        ExtractionResult::new(
            fallback_message(original.bytes.len()),
            source_file,
            ExtractionMethod::None,
        )
    }

    /// One engine call under the attempt timeout; remote engines also wait
    /// for a global permit, and that wait counts against the timeout.
    async fn attempt(
        &self,
        engine: &dyn OcrEngine,
        input: &OcrInput,
        timeout: Duration,
    ) -> Option<String> {
        let call = async {
            let _permit = if engine.is_remote() {
                match self.remote_permits.acquire().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return Err(anyhow::anyhow!("remote call limiter closed")),
                }
            } else {
                None
            };
            engine.recognize(input).await
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                tracing::warn!(engine = engine.name(), error = %e, "OCR engine failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    engine = engine.name(),
                    timeout_secs = timeout.as_secs(),
                    "OCR engine timed out"
                );
                None
            }
        }
    }

    /// Extract every path on the worker pool. Results come back in input
    /// order; dropping the returned future aborts outstanding work.
    pub async fn extract_many(&self, paths: &[PathBuf]) -> Vec<ExtractionResult> {
        let mut tasks = JoinSet::new();

        for (index, path) in paths.iter().cloned().enumerate() {
            let extractor = self.clone();
            tasks.spawn(async move {
                let _permit = extractor.page_permits.clone().acquire_owned().await.ok();
                (index, extractor.extract(&path).await)
            });
        }

        let mut slots: Vec<Option<ExtractionResult>> = vec![None; paths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Extraction task failed"),
            }
        }

        slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    let size = std::fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0);
                    ExtractionResult::new(
                        fallback_message(size),
                        path.file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        ExtractionMethod::None,
                    )
                })
            })
            .collect()
    }
}

async fn preprocess(original: &OcrInput) -> OcrInput {
    let bytes = original.bytes.clone();
    match tokio::task::spawn_blocking(move || preprocess_for_ocr(&bytes)).await {
        Ok(Ok(jpeg)) => OcrInput::new(jpeg, "image/jpeg", original.kind),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Preprocessing failed, using original image");
            original.clone()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Preprocessing task failed, using original image");
            original.clone()
        }
    }
}

//! Google Cloud Vision text detection over the REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use loandesk_core::models::ExtractionMethod;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::ocr::{DocumentKind, OcrEngine, OcrInput};

const DEFAULT_BASE_URL: &str = "https://vision.googleapis.com";

/// Google Vision OCR engine.
///
/// Images go through `images:annotate` with `TEXT_DETECTION`; PDFs through
/// `files:annotate` with `DOCUMENT_TEXT_DETECTION`, which reads inline PDF
/// content page by page.
pub struct GoogleVisionClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Debug for GoogleVisionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GoogleVisionClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleVisionClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client for Google Vision API")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (used with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post(&self, method: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/{}?key={}", self.base_url, method, self.api_key);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Google Vision API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let status_name = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.status);
            return Err(anyhow::anyhow!(
                "{}: {} - {}",
                describe_status(status_name.as_deref()),
                status,
                error_text
            ));
        }

        Ok(response)
    }

    async fn detect_image_text(&self, content: &str) -> Result<String> {
        let body = json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let response: AnnotateResponse = self
            .post("images:annotate", body)
            .await?
            .json()
            .await
            .context("Failed to parse Google Vision API response")?;

        let Some(first) = response.responses.unwrap_or_default().into_iter().next() else {
            return Ok(String::new());
        };
        first.into_text()
    }

    async fn detect_document_text(&self, content: &str) -> Result<String> {
        let body = json!({
            "requests": [{
                "inputConfig": { "content": content, "mimeType": "application/pdf" },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
            }]
        });

        let response: FilesAnnotateResponse = self
            .post("files:annotate", body)
            .await?
            .json()
            .await
            .context("Failed to parse Google Vision API response")?;

        let mut pages = Vec::new();
        for file in response.responses.unwrap_or_default() {
            if let Some(error) = file.error {
                return Err(error.into_error());
            }
            for page in file.responses.unwrap_or_default() {
                let text = page.into_text()?;
                if !text.trim().is_empty() {
                    pages.push(text);
                }
            }
        }
        Ok(pages.join("\n"))
    }
}

#[async_trait]
impl OcrEngine for GoogleVisionClient {
    fn name(&self) -> &str {
        "google_vision"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Vision
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn supports(&self, _kind: DocumentKind) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn recognize(&self, input: &OcrInput) -> Result<String> {
        let content = base64::engine::general_purpose::STANDARD.encode(&input.bytes);
        let text = match input.kind {
            DocumentKind::Image => self.detect_image_text(&content).await?,
            DocumentKind::Pdf => self.detect_document_text(&content).await?,
        };

        if text.trim().is_empty() {
            tracing::debug!(kind = ?input.kind, "No text detected by Google Vision");
        }
        Ok(text)
    }
}

/// Readable summary for the canonical Google API status names.
fn describe_status(status: Option<&str>) -> &'static str {
    match status {
        Some("RESOURCE_EXHAUSTED") => "Google Vision API quota exceeded",
        Some("PERMISSION_DENIED") | Some("UNAUTHENTICATED") => {
            "Google Vision API permission denied, check the API key"
        }
        Some("INVALID_ARGUMENT") => "Document format not supported or file corrupted",
        Some("DEADLINE_EXCEEDED") => "Google Vision API request timed out",
        _ => "Google Vision API request failed",
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

impl VisionStatus {
    fn into_error(self) -> anyhow::Error {
        anyhow::anyhow!(
            "{}: {:?} - {}",
            describe_status(self.status.as_deref()),
            self.code,
            self.message.unwrap_or_default()
        )
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    responses: Option<Vec<AnnotateImageResponse>>,
}

#[derive(Debug, Deserialize)]
struct FilesAnnotateResponse {
    responses: Option<Vec<AnnotateFileResponse>>,
}

#[derive(Debug, Deserialize)]
struct AnnotateFileResponse {
    responses: Option<Vec<AnnotateImageResponse>>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    text_annotations: Option<Vec<EntityAnnotation>>,
    full_text_annotation: Option<TextAnnotation>,
    error: Option<VisionStatus>,
}

impl AnnotateImageResponse {
    /// The full-text annotation wins; otherwise the first text annotation
    /// holds the whole detected text.
    fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(error.into_error());
        }
        if let Some(text) = self.full_text_annotation.and_then(|a| a.text) {
            return Ok(text);
        }
        Ok(self
            .text_annotations
            .and_then(|annotations| annotations.into_iter().next())
            .and_then(|a| a.description)
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    text: Option<String>,
}

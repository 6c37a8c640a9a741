//! OpenAI chat-completions client
//!
//! Serves two roles: the last OCR fallback (vision model reading the raw
//! image) and the language model behind structured-data extraction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use loandesk_core::models::ExtractionMethod;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::ocr::{DocumentKind, OcrEngine, OcrInput};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const VISION_MAX_TOKENS: u32 = 4000;
/// Image types the vision endpoint accepts as data URLs.
const VISION_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

const VISION_SYSTEM_PROMPT: &str = "You are a document analysis expert specialized in precise \
text extraction from images of documents. Extract ALL visible text with perfect accuracy, \
including small print, headers, footers and table cells read row by row. Pay special attention \
to numbers, monetary amounts, dates and proper names. Preserve the layout where possible and \
mark unreadable text with [?]. Return only the extracted text.";

const VISION_USER_PROMPT: &str = "Extract ALL visible text from this document image. Every word, \
number and character matters; do not summarize.";

/// A language model that answers with a JSON object.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    fn model(&self) -> &str;

    /// Run a chat completion in JSON mode at temperature 0 and return the
    /// raw message content.
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    vision_model: String,
    base_url: String,
}

impl Debug for OpenAiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client for OpenAI API")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            vision_model: vision_model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "OpenAI API request failed: {} - {}",
                status,
                error_text
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI API returned no message content"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::text("system", system_prompt),
                ChatMessage::text("user", user_prompt),
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
            temperature: Some(0.0),
            max_tokens: None,
        };

        self.chat(&request).await
    }
}

#[async_trait]
impl OcrEngine for OpenAiClient {
    fn name(&self) -> &str {
        "openai_vision"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::LlmVision
    }

    fn is_remote(&self) -> bool {
        true
    }

    /// Formats the chat API rejects are sent as the preprocessed JPEG.
    fn wants_preprocessed_input(&self, mime_type: &str) -> bool {
        !VISION_MIME_TYPES.contains(&mime_type)
    }

    /// The chat API only accepts raster images.
    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Image
    }

    async fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn recognize(&self, input: &OcrInput) -> Result<String> {
        let data_url = format!(
            "data:{};base64,{}",
            input.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&input.bytes)
        );

        let request = ChatRequest {
            model: &self.vision_model,
            messages: vec![
                ChatMessage::text("system", VISION_SYSTEM_PROMPT),
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: VISION_USER_PROMPT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ]),
                },
            ],
            response_format: None,
            temperature: None,
            max_tokens: Some(VISION_MAX_TOKENS),
        };

        Ok(self.chat(&request).await?.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

impl<'a> ChatMessage<'a> {
    fn text(role: &'static str, text: &'a str) -> Self {
        Self {
            role,
            content: MessageContent::Text(text),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::Server) -> OpenAiClient {
        OpenAiClient::new("sk-test", "gpt-4o", "gpt-4o-mini")
            .unwrap()
            .with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_complete_json_requests_json_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "response_format": { "type": "json_object" },
                "temperature": 0.0
            })))
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"{\"employer\":\"Acme\"}"}}]}"#,
            )
            .create_async()
            .await;

        let content = client(&server)
            .complete_json("system", "user")
            .await
            .unwrap();

        assert_eq!(content, r#"{"employer":"Acme"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_vision_sends_data_url_with_token_cap() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({ "model": "gpt-4o-mini", "max_tokens": 4000 })),
                Matcher::Regex("data:image/png;base64,AQID".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"  Bank statement  "}}]}"#)
            .create_async()
            .await;

        let input = OcrInput::new(vec![1, 2, 3], "image/png", DocumentKind::Image);
        let text = client(&server).recognize(&input).await.unwrap();

        assert_eq!(text, "Bank statement");
        mock.assert_async().await;
    }

    #[test]
    fn test_unsupported_image_formats_use_preprocessed_jpeg() {
        let client = OpenAiClient::new("sk-test", "gpt-4o", "gpt-4o-mini").unwrap();
        assert!(!client.wants_preprocessed_input("image/png"));
        assert!(!client.wants_preprocessed_input("image/jpeg"));
        assert!(client.wants_preprocessed_input("image/tiff"));
        assert!(client.wants_preprocessed_input("image/bmp"));
    }

    #[tokio::test]
    async fn test_api_error_includes_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .complete_json("s", "u")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn test_missing_content_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        assert!(client(&server).complete_json("s", "u").await.is_err());
    }
}

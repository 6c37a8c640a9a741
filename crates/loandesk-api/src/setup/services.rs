//! Provider clients, pipeline and application state

use crate::state::AppState;
use anyhow::{Context, Result};
use loandesk_core::Config;
use loandesk_db::SubmissionStore;
use loandesk_plugins::{GoogleVisionClient, LlmClient, OcrEngine, OpenAiClient, TesseractEngine};
use loandesk_processing::{PdfRasterizer, PdfiumRasterizer, ScratchSpace, Structurer, TextExtractor};
use loandesk_services::{AdminEventBus, SubmissionPipeline};
use loandesk_storage::Storage;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Everything the application state is assembled from. Production builds
/// it from configuration; tests inject fakes.
pub struct StateParts {
    pub config: Config,
    pub store: Arc<dyn SubmissionStore>,
    pub storage: Arc<dyn Storage>,
    pub ocr_engines: Vec<Arc<dyn OcrEngine>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub rasterizer: Arc<dyn PdfRasterizer>,
}

pub fn initialize_services(
    config: &Config,
    store: Arc<dyn SubmissionStore>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let providers = config.providers();

    let openai = match providers.openai_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(Arc::new(
            OpenAiClient::new(key, &providers.openai_model, &providers.openai_vision_model)
                .context("Failed to create OpenAI client")?,
        )),
        None => {
            tracing::warn!("OPENAI_API_KEY not set, structuring returns raw text only");
            None
        }
    };

    let mut ocr_engines: Vec<Arc<dyn OcrEngine>> = Vec::new();
    match providers.google_vision_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => ocr_engines.push(Arc::new(
            GoogleVisionClient::new(key).context("Failed to create Google Vision client")?,
        )),
        None => tracing::warn!("GOOGLE_VISION_API_KEY not set, skipping Vision OCR"),
    }
    ocr_engines.push(Arc::new(TesseractEngine::new(
        &providers.tesseract_path,
        &providers.tesseract_lang,
    )));
    if let Some(openai) = &openai {
        ocr_engines.push(openai.clone());
    }

    Ok(build_state(StateParts {
        config: config.clone(),
        store,
        storage,
        ocr_engines,
        llm: openai.map(|client| client as Arc<dyn LlmClient>),
        rasterizer: Arc::new(PdfiumRasterizer::new(providers.pdfium_library_path.clone())),
    }))
}

pub fn build_state(parts: StateParts) -> Arc<AppState> {
    let pipeline_config = parts.config.pipeline();
    let remote_permits = Arc::new(Semaphore::new(pipeline_config.max_concurrent_remote_calls.max(1)));

    let extractor = TextExtractor::new(parts.ocr_engines, remote_permits.clone(), pipeline_config.ocr_workers);
    let ocr_engines = extractor.engine_names();
    let structurer = Structurer::new(parts.llm).with_remote_permits(remote_permits);
    let structuring_enabled = structurer.is_configured();

    let events = AdminEventBus::new();
    let pipeline = SubmissionPipeline::new(
        extractor,
        structurer,
        parts.rasterizer,
        parts.storage.clone(),
        parts.store.clone(),
        events.clone(),
        ScratchSpace::new(&pipeline_config.scratch_dir),
    )
    .with_timeout(parts.config.pipeline_timeout());

    tracing::info!(
        ocr_engines = %ocr_engines.join(" -> "),
        structuring_enabled,
        ocr_workers = pipeline_config.ocr_workers,
        "Document pipeline initialized"
    );

    Arc::new(AppState {
        config: parts.config,
        store: parts.store,
        storage: parts.storage,
        pipeline,
        events,
        ocr_engines,
        structuring_enabled,
    })
}

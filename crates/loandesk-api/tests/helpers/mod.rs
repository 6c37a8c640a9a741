//! Test helpers: an in-process app with fake providers and an in-memory store.
//!
//! No database, network or native libraries are needed: OCR and the language
//! model are fakes, PDFs "rasterize" into placeholder pages and spreadsheets
//! land in a temp directory served by local storage.

pub mod fakes;

use axum_test::TestServer;
use loandesk_api::setup::routes::setup_routes;
use loandesk_api::setup::services::{build_state, StateParts};
use loandesk_api::AppState;
use loandesk_core::{Config, IntakeConfig};
use loandesk_db::InMemorySubmissionStore;
use loandesk_plugins::{LlmClient, OcrEngine};
use loandesk_storage::LocalStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_URL: &str = "http://localhost:8000/temp";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: InMemorySubmissionStore,
    pub scratch_dir: PathBuf,
    pub _temp_dir: TempDir,
}

pub struct TestOptions {
    pub ocr: Vec<Arc<dyn OcrEngine>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub store: InMemorySubmissionStore,
    pub max_file_size_bytes: usize,
    pub pipeline_timeout_seconds: u64,
    /// Serve over a real socket; WebSocket tests need it.
    pub http_transport: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            ocr: vec![Arc::new(fakes::FakeOcr::text(fakes::PAYSLIP_TEXT))],
            llm: Some(Arc::new(fakes::FakeLlm::replying(fakes::PAYSLIP_JSON))),
            store: InMemorySubmissionStore::new(),
            max_file_size_bytes: 1024 * 1024,
            pipeline_timeout_seconds: 30,
            http_transport: false,
        }
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage_dir = temp_dir.path().join("public");
    let scratch_dir = temp_dir.path().join("scratch");

    let mut intake = IntakeConfig::defaults("postgres://unused@localhost/loandesk");
    intake.local_storage_path = storage_dir.to_string_lossy().into_owned();
    intake.local_storage_base_url = BASE_URL.to_string();
    intake.pipeline.scratch_dir = scratch_dir.clone();
    intake.pipeline.max_file_size_bytes = options.max_file_size_bytes;
    intake.pipeline.pipeline_timeout_seconds = options.pipeline_timeout_seconds;
    let config = Config(Box::new(intake));

    let storage = Arc::new(
        LocalStorage::new(&storage_dir, BASE_URL.to_string())
            .await
            .unwrap(),
    );

    let state = build_state(StateParts {
        config: config.clone(),
        store: Arc::new(options.store.clone()),
        storage,
        ocr_engines: options.ocr,
        llm: options.llm,
        rasterizer: Arc::new(fakes::FakeRasterizer { pages: 2 }),
    });

    let router = setup_routes(&config, state.clone()).unwrap();
    let server = if options.http_transport {
        TestServer::builder().http_transport().build(router).unwrap()
    } else {
        TestServer::new(router).unwrap()
    };

    TestApp {
        server,
        state,
        store: options.store,
        scratch_dir,
        _temp_dir: temp_dir,
    }
}

/// True when no per-submission directory is left behind.
pub fn scratch_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

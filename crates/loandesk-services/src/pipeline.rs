//! Submission pipeline
//!
//! Drives one submission from uploaded files to a persisted record:
//! classify, rasterize PDFs, extract text, structure it, write and upload a
//! spreadsheet, persist, then notify admins. Every collaborator is injected
//! so the pipeline runs against fakes in tests.

use bytes::Bytes;
use loandesk_core::models::{
    ApplicantDetails, ExtractionResult, NewSubmission, NotificationEvent, StructuredRecord,
    SubmissionRecord,
};
use loandesk_core::AppError;
use loandesk_db::{NewNotification, NewSpreadsheet, SubmissionStore};
use loandesk_processing::{
    generate_spreadsheet, PdfRasterizer, ScratchDir, ScratchSpace, Structurer, TextExtractor,
};
use loandesk_storage::{spreadsheet_key, Storage};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::events::{AdminEvent, AdminEventBus};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// A file received with the submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub applicant: ApplicantDetails,
    pub files: Vec<UploadedFile>,
    /// Extra fields to point the model at; empty uses the loan defaults.
    pub field_hints: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission: SubmissionRecord,
    pub uploaded_urls: Vec<String>,
    pub extraction: Vec<ExtractionResult>,
    pub record: StructuredRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Classified,
    Rasterized,
    Extracted,
    Structured,
    Exported,
    Uploaded,
    Persisted,
    Notified,
    Completed,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Classified => "classified",
            PipelineStage::Rasterized => "rasterized",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Structured => "structured",
            PipelineStage::Exported => "exported",
            PipelineStage::Uploaded => "uploaded",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Notified => "notified",
            PipelineStage::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

/// Classify an upload by extension.
pub fn classify(file_name: &str) -> Result<FileKind, AppError> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ext == "pdf" {
        Ok(FileKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(FileKind::Image)
    } else {
        Err(AppError::UnsupportedFileType(format!(
            "{} (accepted: pdf, {})",
            file_name,
            IMAGE_EXTENSIONS.join(", ")
        )))
    }
}

/// Reduce an uploaded name to a safe basename.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    extractor: TextExtractor,
    structurer: Structurer,
    rasterizer: Arc<dyn PdfRasterizer>,
    storage: Arc<dyn Storage>,
    store: Arc<dyn SubmissionStore>,
    events: AdminEventBus,
    scratch: ScratchSpace,
    timeout: Option<Duration>,
}

impl SubmissionPipeline {
    pub fn new(
        extractor: TextExtractor,
        structurer: Structurer,
        rasterizer: Arc<dyn PdfRasterizer>,
        storage: Arc<dyn Storage>,
        store: Arc<dyn SubmissionStore>,
        events: AdminEventBus,
        scratch: ScratchSpace,
    ) -> Self {
        Self {
            extractor,
            structurer,
            rasterizer,
            storage,
            store,
            events,
            scratch,
            timeout: None,
        }
    }

    /// Deadline for everything up to persistence. `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn events(&self) -> &AdminEventBus {
        &self.events
    }

    #[tracing::instrument(skip(self, request), fields(submission_id, user_id = %request.applicant.user_id, files = request.files.len()))]
    pub async fn process(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, AppError> {
        if request.files.is_empty() {
            return Err(AppError::InvalidInput("No files to upload".to_string()));
        }

        let submission_id = Uuid::new_v4();
        tracing::Span::current().record("submission_id", tracing::field::display(submission_id));
        let start = Instant::now();
        log_stage(PipelineStage::Received);

        let scratch = self
            .scratch
            .allocate(submission_id)
            .map_err(|e| AppError::Internal(format!("Failed to allocate scratch directory: {}", e)))?;

        let run = self.run(submission_id, &request, &scratch);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_secs = limit.as_secs(), "Submission pipeline timed out");
                    Err(AppError::Timeout {
                        seconds: limit.as_secs(),
                    })
                }
            },
            None => run.await,
        };
        scratch.close();

        let (submission, extraction, record) = result?;
        let uploaded_urls = submission.secure_url.clone();

        self.notify(&request.applicant, &submission, &uploaded_urls).await;
        log_stage(PipelineStage::Notified);

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            stage = %PipelineStage::Completed,
            "Submission processed"
        );

        Ok(SubmissionOutcome {
            submission,
            uploaded_urls,
            extraction,
            record,
        })
    }

    async fn run(
        &self,
        submission_id: Uuid,
        request: &SubmissionRequest,
        scratch: &ScratchDir,
    ) -> Result<(SubmissionRecord, Vec<ExtractionResult>, StructuredRecord), AppError> {
        let kinds = request
            .files
            .iter()
            .map(|file| classify(&file.file_name))
            .collect::<Result<Vec<_>, _>>()?;
        log_stage(PipelineStage::Classified);

        let uploads = scratch.subdir("uploads")?;
        let mut images: Vec<PathBuf> = Vec::new();
        let mut origins: Vec<String> = Vec::new();
        let mut pdf_count = 0usize;

        for (idx, (file, kind)) in request.files.iter().zip(&kinds).enumerate() {
            let path = uploads.join(format!("{}-{}", idx + 1, sanitize_file_name(&file.file_name)));
            tokio::fs::write(&path, &file.data).await?;

            match kind {
                FileKind::Image => {
                    images.push(path);
                    origins.push(file.file_name.clone());
                }
                FileKind::Pdf => {
                    pdf_count += 1;
                    let pages_dir = scratch.path().join(format!("pages-{}", pdf_count));
                    let pages = self.rasterizer.rasterize(&path, &pages_dir).await?;
                    tracing::debug!(file = %file.file_name, pages = pages.len(), "PDF rasterized");
                    origins.extend((1..=pages.len()).map(|n| page_origin(&file.file_name, n)));
                    images.extend(pages);
                }
            }
        }
        log_stage(PipelineStage::Rasterized);

        let mut extraction = self.extractor.extract_many(&images).await;
        for (result, origin) in extraction.iter_mut().zip(origins) {
            result.source_file = origin;
        }
        tracing::info!(
            sources = extraction.len(),
            recognized = extraction.iter().filter(|r| r.is_recognized()).count(),
            "Text extraction finished"
        );
        log_stage(PipelineStage::Extracted);

        let hints: Vec<&str> = request.field_hints.iter().map(String::as_str).collect();
        let record = self.structurer.structure(&extraction, &hints).await;
        log_stage(PipelineStage::Structured);

        let label = if request.applicant.full_name.trim().is_empty() {
            request.applicant.user_id.clone()
        } else {
            request.applicant.full_name.clone()
        };
        let out_dir = scratch.path().to_path_buf();
        let records = vec![record];
        let (records, spreadsheet) = tokio::task::spawn_blocking(move || {
            let result = generate_spreadsheet(&records, &label, &out_dir);
            (records, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Spreadsheet task failed: {}", e)))?;
        let spreadsheet = spreadsheet?;
        let record = records.into_iter().next().unwrap_or_else(|| StructuredRecord::new(""));
        log_stage(PipelineStage::Exported);

        let bytes = tokio::fs::read(&spreadsheet.path).await?;
        let key = spreadsheet_key(submission_id, &spreadsheet.file_name);
        let url = self.storage.upload(&key, bytes, XLSX_CONTENT_TYPE).await?;
        log_stage(PipelineStage::Uploaded);

        let persisted = self
            .store
            .create_submission(
                NewSubmission {
                    id: submission_id,
                    applicant: request.applicant.clone(),
                    secure_url: vec![url.clone()],
                },
                NewSpreadsheet {
                    file_name: spreadsheet.file_name.clone(),
                    url,
                    row_count: spreadsheet.row_count as i32,
                },
            )
            .await;

        let submission = match persisted {
            Ok(submission) => submission,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned spreadsheet");
                }
                return Err(e);
            }
        };
        log_stage(PipelineStage::Persisted);

        Ok((submission, extraction, record))
    }

    /// Best-effort: failures are logged and never fail the submission.
    async fn notify(&self, applicant: &ApplicantDetails, submission: &SubmissionRecord, files: &[String]) {
        let event = NotificationEvent::new_submission(applicant, files.to_vec());
        let notification = NewNotification {
            submission_id: Some(submission.id),
            user_id: applicant.user_id.clone(),
            title: event.title(),
            message: event.message(),
            kind: "submission".to_string(),
        };

        self.events.publish(AdminEvent::new_submission(event));

        if let Err(e) = self.store.log_notification(notification).await {
            tracing::warn!(error = %e, "Failed to log admin notification");
        }
    }
}

/// Label for one rendered page: `statement.pdf#page2`.
pub fn page_origin(file_name: &str, page: usize) -> String {
    format!("{}#page{}", file_name, page)
}

fn log_stage(stage: PipelineStage) {
    tracing::debug!(stage = %stage, "Pipeline stage reached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loandesk_core::models::{ExtractionMethod, SubmissionStatus};
    use loandesk_db::InMemorySubmissionStore;
    use loandesk_plugins::{DocumentKind, OcrEngine, OcrInput};
    use loandesk_processing::RasterizeError;
    use loandesk_storage::{LocalStorage, StorageBackend, StorageResult};
    use std::path::Path;
    use tokio::sync::Semaphore;

    const PAYSLIP_TEXT: &str = "ACME PTY LTD PAYSLIP\nGross Salary: $5,000\nNet Salary: $3,900\nTax: $1,100";

    #[derive(Debug)]
    struct FixedOcr(Duration);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
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
            tokio::time::sleep(self.0).await;
            Ok(PAYSLIP_TEXT.to_string())
        }
    }

    /// Writes `pages` placeholder page files.
    struct FakeRasterizer {
        pages: usize,
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
                let path = out.join(loandesk_processing::page_file_name(n));
                std::fs::write(&path, b"png").unwrap();
                pages.push(path);
            }
            Ok(pages)
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn upload(&self, _key: &str, _data: Vec<u8>, _ct: &str) -> StorageResult<String> {
            Err(loandesk_storage::StorageError::UploadFailed("disk full".to_string()))
        }
        async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(loandesk_storage::StorageError::NotFound(key.to_string()))
        }
        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
        fn url_for(&self, key: &str) -> String {
            key.to_string()
        }
        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    struct Harness {
        _root: tempfile::TempDir,
        scratch_root: PathBuf,
        store: InMemorySubmissionStore,
        pipeline: SubmissionPipeline,
    }

    async fn harness_with(storage: Option<Arc<dyn Storage>>, store: InMemorySubmissionStore, ocr_delay: Duration) -> Harness {
        let root = tempfile::tempdir().unwrap();
        let scratch_root = root.path().join("scratch");
        let storage = match storage {
            Some(storage) => storage,
            None => Arc::new(
                LocalStorage::new(root.path().join("public"), "http://localhost:8000/temp".to_string())
                    .await
                    .unwrap(),
            ),
        };

        let extractor = TextExtractor::new(
            vec![Arc::new(FixedOcr(ocr_delay))],
            Arc::new(Semaphore::new(2)),
            2,
        );
        let pipeline = SubmissionPipeline::new(
            extractor,
            Structurer::new(None),
            Arc::new(FakeRasterizer { pages: 2 }),
            storage,
            Arc::new(store.clone()),
            AdminEventBus::new(),
            ScratchSpace::new(&scratch_root),
        );

        Harness {
            _root: root,
            scratch_root,
            store,
            pipeline,
        }
    }

    async fn harness() -> Harness {
        harness_with(None, InMemorySubmissionStore::new(), Duration::ZERO).await
    }

    fn request(files: &[&str]) -> SubmissionRequest {
        SubmissionRequest {
            applicant: ApplicantDetails {
                user_id: "user-1".to_string(),
                loan_type: "home".to_string(),
                full_name: "Jane Roe".to_string(),
                permanent_address: "1 Main St".to_string(),
                current_address: "1 Main St".to_string(),
            },
            files: files
                .iter()
                .map(|name| UploadedFile {
                    file_name: name.to_string(),
                    content_type: None,
                    data: Bytes::from_static(b"file-bytes"),
                })
                .collect(),
            field_hints: Vec::new(),
        }
    }

    fn scratch_is_empty(root: &Path) -> bool {
        std::fs::read_dir(root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_single_image_produces_one_url_and_persisted_row() {
        let h = harness().await;
        let mut admin = h.pipeline.events().subscribe();

        let outcome = h.pipeline.process(request(&["payslip.jpg"])).await.unwrap();

        assert_eq!(outcome.uploaded_urls.len(), 1);
        let url = &outcome.uploaded_urls[0];
        assert!(url.starts_with("http://localhost:8000/temp/excel/"));
        assert!(url.ends_with(".xlsx"));

        let rows = h.store.submissions();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].secure_url, vec![url.clone()]);
        assert_eq!(rows[0].status, SubmissionStatus::Pending);
        assert_eq!(h.store.spreadsheets().len(), 1);
        assert_eq!(h.store.notifications().len(), 1);

        let event = admin.try_recv().unwrap();
        assert_eq!(event.event, "new-document-submission");
        assert_eq!(event.data.files, vec![url.clone()]);

        assert!(outcome.record.raw_text().contains("Gross Salary: $5,000"));
        assert_eq!(outcome.record.document_type(), Some("Unknown"));
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_pdf_pages_are_extracted_in_order() {
        let h = harness().await;

        let outcome = h
            .pipeline
            .process(request(&["id.png", "statement.pdf"]))
            .await
            .unwrap();

        let sources: Vec<&str> = outcome.extraction.iter().map(|r| r.source_file.as_str()).collect();
        assert_eq!(
            sources,
            vec!["id.png", "statement.pdf#page1", "statement.pdf#page2"]
        );
    }

    #[tokio::test]
    async fn test_pages_of_several_pdfs_keep_distinct_sources() {
        let h = harness().await;

        let outcome = h
            .pipeline
            .process(request(&["payslip.pdf", "bank.pdf"]))
            .await
            .unwrap();

        let sources: Vec<&str> = outcome.extraction.iter().map(|r| r.source_file.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "payslip.pdf#page1",
                "payslip.pdf#page2",
                "bank.pdf#page1",
                "bank.pdf#page2",
            ]
        );
        let unique: std::collections::HashSet<&str> = sources.iter().copied().collect();
        assert_eq!(unique.len(), sources.len());
    }

    #[tokio::test]
    async fn test_no_files_is_invalid_input() {
        let h = harness().await;
        let err = h.pipeline.process(request(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "No files to upload"));
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_and_cleans_scratch() {
        let h = harness().await;
        let err = h
            .pipeline
            .process(request(&["notes.docx"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFileType(_)));
        assert!(h.store.submissions().is_empty());
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_upload_failure_persists_nothing() {
        let h = harness_with(
            Some(Arc::new(FailingStorage)),
            InMemorySubmissionStore::new(),
            Duration::ZERO,
        )
        .await;

        let err = h.pipeline.process(request(&["scan.jpg"])).await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert!(h.store.submissions().is_empty());
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_request() {
        let h = harness_with(
            None,
            InMemorySubmissionStore::with_failing_notifications(),
            Duration::ZERO,
        )
        .await;

        let outcome = h.pipeline.process(request(&["scan.jpg"])).await.unwrap();

        assert_eq!(outcome.uploaded_urls.len(), 1);
        assert_eq!(h.store.submissions().len(), 1);
        assert!(h.store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_returns_timeout_error_and_cleans_up() {
        let h = harness_with(None, InMemorySubmissionStore::new(), Duration::from_secs(10)).await;
        let pipeline = h.pipeline.clone().with_timeout(Some(Duration::from_millis(50)));

        let err = pipeline.process(request(&["scan.jpg"])).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout { .. }));
        assert!(h.store.submissions().is_empty());
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("A.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(classify("scan.TIFF").unwrap(), FileKind::Image);
        assert!(classify("archive.zip").is_err());
        assert!(classify("noextension").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pay slip.jpg"), "pay_slip.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}

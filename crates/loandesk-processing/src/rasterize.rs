//! PDF rasterization
//!
//! Renders every page of a PDF to `page1.png`, `page2.png`, ... through
//! pdfium. Rendering is CPU-bound and pdfium is synchronous, so the work runs
//! on the blocking pool.

use async_trait::async_trait;
use image::ImageFormat;
use loandesk_core::AppError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

/// Fixed render scale; 3x the PDF's native 72 dpi.
pub const RENDER_SCALE: f32 = 3.0;

#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDFium library unavailable: {0}")]
    Library(String),

    #[error("Failed to load PDF {path}: {detail}")]
    Load { path: PathBuf, detail: String },

    #[error("Failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("Failed to write page {page}: {detail}")]
    Write { page: usize, detail: String },

    #[error("Rasterization task failed: {0}")]
    Task(String),
}

impl From<RasterizeError> for AppError {
    fn from(err: RasterizeError) -> Self {
        AppError::Rasterization(err.to_string())
    }
}

/// File name for a 1-based page number.
pub fn page_file_name(page_number: usize) -> String {
    format!("page{}.png", page_number)
}

#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    /// Render all pages into `output_dir` (created if absent) and return the
    /// image paths in page order.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizeError>;
}

/// pdfium-backed rasterizer. Binds to the library in `library_path` when
/// given, otherwise to the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl PdfRasterizer for PdfiumRasterizer {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, RasterizeError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| RasterizeError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let library_path = self.library_path.clone();
        let pdf_path = pdf_path.to_path_buf();
        let output_dir = output_dir.to_path_buf();

        let start = std::time::Instant::now();
        let pages = tokio::task::spawn_blocking(move || {
            render_blocking(library_path.as_deref(), &pdf_path, &output_dir)
        })
        .await
        .map_err(|e| RasterizeError::Task(e.to_string()))??;

        tracing::debug!(
            pages = pages.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "PDF rasterized"
        );

        Ok(pages)
    }
}

fn bind(library_path: Option<&Path>) -> Result<Pdfium, RasterizeError> {
    let bindings = match library_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(path.join(Pdfium::pdfium_platform_library_name()))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| RasterizeError::Library(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn render_blocking(
    library_path: Option<&Path>,
    pdf_path: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, RasterizeError> {
    let pdfium = bind(library_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| RasterizeError::Load {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);
    let pages = document.pages();
    let total = pages.len() as usize;
    let mut written = Vec::with_capacity(total);

    for idx in 0..total {
        let page_number = idx + 1;

        let page = pages
            .get(idx as u16)
            .map_err(|e| RasterizeError::Render {
                page: page_number,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RasterizeError::Render {
                page: page_number,
                detail: format!("{:?}", e),
            })?;

        let out_path = output_dir.join(page_file_name(page_number));
        bitmap
            .as_image()
            .save_with_format(&out_path, ImageFormat::Png)
            .map_err(|e| RasterizeError::Write {
                page: page_number,
                detail: e.to_string(),
            })?;

        written.push(out_path);
    }

    Ok(written)
}

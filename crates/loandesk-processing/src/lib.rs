//! Document processing stages
//!
//! PDF rasterization, OCR preprocessing, text extraction, structuring,
//! spreadsheet generation and scratch-directory management.

pub mod extractor;
pub mod preprocess;
pub mod rasterize;
pub mod scratch;
pub mod spreadsheet;
pub mod structurer;

pub use extractor::{normalize_whitespace, TextExtractor};
pub use rasterize::{page_file_name, PdfRasterizer, PdfiumRasterizer, RasterizeError};
pub use scratch::{ScratchDir, ScratchSpace};
pub use spreadsheet::{generate_spreadsheet, SheetLayout, SpreadsheetError};
pub use structurer::{Structurer, DEFAULT_FIELD_HINTS};

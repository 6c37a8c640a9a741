use std::path::PathBuf;

/// A spreadsheet written to scratch storage, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Data rows, excluding the header.
    pub row_count: usize,
    /// Columns including the serial-number column.
    pub column_count: usize,
}

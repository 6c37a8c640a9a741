//! Spreadsheet generation
//!
//! One worksheet, one row per structured record. Columns are the union of
//! record keys; `raw_extracted_text` always comes last so the extracted
//! fields stay readable.

use chrono::Utc;
use loandesk_core::models::{SpreadsheetFile, StructuredRecord, RAW_TEXT_FIELD};
use loandesk_core::AppError;
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, XlsxError};
use std::path::Path;

pub const WORKSHEET_NAME: &str = "Document Data";
pub const SERIAL_HEADER: &str = "S no.";
const SERIAL_COLUMN_WIDTH: usize = 8;
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 50;
const HEADER_FILL: u32 = 0xD9D9D9;
/// Excel rejects longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("No records to write")]
    EmptyInput,

    #[error("Workbook error: {0}")]
    Workbook(#[from] XlsxError),
}

impl From<SpreadsheetError> for AppError {
    fn from(err: SpreadsheetError) -> Self {
        AppError::Spreadsheet(err.to_string())
    }
}

/// Cell content and column sizing, computed before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    /// Record keys in column order, excluding the serial column.
    pub keys: Vec<String>,
    /// Header row, starting with the serial column.
    pub headers: Vec<String>,
    /// Column widths, starting with the serial column.
    pub widths: Vec<usize>,
    /// Data cells per record, excluding the serial column.
    pub rows: Vec<Vec<String>>,
}

impl SheetLayout {
    pub fn build(records: &[StructuredRecord]) -> Result<Self, SpreadsheetError> {
        if records.is_empty() {
            return Err(SpreadsheetError::EmptyInput);
        }

        let mut keys: Vec<String> = Vec::new();
        let mut has_raw_text = false;
        for record in records {
            for key in record.keys() {
                if key == RAW_TEXT_FIELD {
                    has_raw_text = true;
                } else if !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
            }
        }
        if has_raw_text {
            keys.push(RAW_TEXT_FIELD.to_string());
        }

        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                keys.iter()
                    .map(|key| truncate_cell(record.get(key).unwrap_or_default()))
                    .collect()
            })
            .collect();

        let mut headers = vec![SERIAL_HEADER.to_string()];
        headers.extend(keys.iter().map(|k| header_label(k)));

        let mut widths = vec![SERIAL_COLUMN_WIDTH];
        for (col, header) in headers.iter().enumerate().skip(1) {
            let longest_cell = rows
                .iter()
                .map(|row| row[col - 1].chars().count())
                .max()
                .unwrap_or(0);
            let width = header.chars().count().max(longest_cell) + 2;
            widths.push(width.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH));
        }

        Ok(Self {
            keys,
            headers,
            widths,
            rows,
        })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// `gross_wage_per_month` -> `Gross Wage Per Month`.
pub fn header_label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        "submission".to_string()
    } else {
        out
    }
}

fn truncate_cell(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_CHARS {
        value.to_string()
    } else {
        value.chars().take(MAX_CELL_CHARS).collect()
    }
}

/// Write `records` to `<dir>/<sanitized label>_<millis>.xlsx`.
pub fn generate_spreadsheet(
    records: &[StructuredRecord],
    label: &str,
    dir: &Path,
) -> Result<SpreadsheetFile, SpreadsheetError> {
    let layout = SheetLayout::build(records)?;

    let file_name = format!(
        "{}_{}.xlsx",
        sanitize_label(label),
        Utc::now().timestamp_millis()
    );
    let path = dir.join(&file_name);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HEADER_FILL));

    for (col, (header, width)) in layout.headers.iter().zip(&layout.widths).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, header, &header_format)?;
        worksheet.set_column_width(col, *width as f64)?;
    }

    for (idx, row) in layout.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        worksheet.write_number(row_num, 0, (idx + 1) as f64)?;
        for (col, value) in row.iter().enumerate() {
            worksheet.write_string(row_num, (col + 1) as u16, value)?;
        }
    }

    workbook.save(&path)?;

    tracing::debug!(
        file_name = %file_name,
        rows = layout.rows.len(),
        columns = layout.column_count(),
        "Spreadsheet written"
    );

    Ok(SpreadsheetFile {
        path,
        file_name,
        row_count: layout.rows.len(),
        column_count: layout.column_count(),
    })
}

//! # Spreadsheet Module
//!
//! Reads one worksheet of an Excel 2007+ workbook (`.xlsx`, `.xlsm`) into a [`Sheet`]:
//! a ragged grid of untyped [`CellValue`]s whose first row is the header.
use crate::error::SheetLoaderError;
use glob::Pattern;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

#[cfg(test)]
pub(crate) mod testing;

pub use cell::{parse_date, parse_number, CellValue};
pub use sheet::{cell_at, Sheet};
pub use xlsx::XlsxWorkbook;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported spreadsheet format '{0}', expected .xlsx or .xlsm")]
    UnsupportedFormat(String),

    #[error("Missing part '{0}' in workbook")]
    FileError(String),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("No worksheet matches '{pattern}', available: {}", .available.join(", "))]
    SheetNotFound { pattern: String, available: Vec<String> },

    #[error("Invalid cell value in sheet '{0}' at {1}: '{2}'")]
    CellValueError(String, String, String),
}

/// Which worksheet to read and how to shape its grid.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Glob pattern of the sheet to read; the first sheet when absent.
    pub sheet_name: Option<String>,
    /// Drop rows without any cell instead of keeping them as empty rows.
    pub skip_empty_rows: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sheet_name: None,
            skip_empty_rows: true,
        }
    }
}

impl ReadOptions {
    pub(crate) fn sheet_pattern(&self) -> Result<Option<Pattern>, SheetLoaderError> {
        Ok(self.sheet_name.as_deref().map(Pattern::new).transpose()?)
    }
}

/// Opens the workbook at `path` and reads the worksheet selected by `options`.
pub fn read_sheet<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Sheet, SheetLoaderError> {
    let path = path.as_ref();
    match path.extension().and_then(OsStr::to_str).map(str::to_ascii_lowercase).as_deref() {
        Some("xlsx") | Some("xlsm") => {
            let file = File::open(path)?;
            XlsxWorkbook::new(BufReader::new(file))?.read_sheet(options)
        }
        _ => Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()).into()),
    }
}

/// Reads the worksheet selected by `options` from an in-memory `.xlsx` upload.
pub fn read_sheet_from_bytes(bytes: Vec<u8>, options: &ReadOptions) -> Result<Sheet, SheetLoaderError> {
    XlsxWorkbook::new(Cursor::new(bytes))?.read_sheet(options)
}

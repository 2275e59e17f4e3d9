use thiserror::Error;

/// Main error type for the sheet loader.
/// Every variant is fatal for the import that raised it; row-level failures never travel through here.
#[derive(Error, Debug)]
pub enum SheetLoaderError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Database module errors
    #[error("{0}")]
    StorageError(#[from] crate::database::storage::StorageError),

    // Import module errors
    #[error("{0}")]
    ImportError(#[from] crate::import::ImportError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetLoaderError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetLoaderError::WithContextError(format!("{}: {}", message, e)))
    }
}

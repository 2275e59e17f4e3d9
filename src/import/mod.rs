//! # Import Module
//!
//! Turns one parsed [`Sheet`](crate::spreadsheet::Sheet) into rows of a relational table:
//!
//! 1. header cells are sanitized into column identifiers,
//! 2. every column gets a type inferred from its data cells,
//! 3. the proposed table is reused, appended to, or forked under a new name,
//! 4. data rows are inserted one by one and the batch is committed once.
//!
//! Failures of single rows are collected into the [`ImportReport`]; anything else aborts the import.
use crate::database::Identifier;
use serde::Serialize;
use thiserror::Error;

pub mod importer;
pub mod loader;
pub mod reconcile;

pub use importer::{plan_columns, Importer};
pub use loader::{coerce, load};
pub use reconcile::{resolve, NameGuard, NameLocks, TableTarget};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Empty sheet, nothing to import")]
    EmptySheet,

    #[error("Header row has no columns")]
    NoColumns,

    #[error("Duplicate column {name} from header columns {first} and {second}")]
    DuplicateColumn {
        name: Identifier,
        first: usize,
        second: usize,
    },

    #[error("Table name lock is poisoned")]
    LockPoisoned,
}

/// A data row that could not be inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based position among the data rows, header excluded
    pub row: usize,
    #[serde(rename = "error")]
    pub message: String,
}

/// Outcome of one import.
///
/// `inserted + errors.len() == total` always holds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportReport {
    pub message: String,
    #[serde(rename = "table")]
    pub table_name: Identifier,
    pub created_table: bool,
    pub inserted: usize,
    pub total: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn new(table_name: Identifier, created_table: bool, total: usize, errors: Vec<RowError>) -> Self {
        Self {
            message: format!("Import finished into {}", table_name),
            inserted: total - errors.len(),
            table_name,
            created_table,
            total,
            errors,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

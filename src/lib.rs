//! # Sheet Loader
//!
//! Loads the rows of a spreadsheet into a relational table.
//!
//! The table is inferred from the sheet when it does not exist yet: header cells become
//! sanitized column names and every column gets a type (text, number or date) inferred
//! from its values. When a table of the same name exists, rows are appended if it has
//! the same columns, otherwise a new table `<name>_<n>` is created next to it.
//!
//! Rows are inserted one at a time; a row that fails is reported in the [`ImportReport`]
//! without stopping the others, and the whole batch is committed once.
//!
//! ## Example
//!
//! ```no_run
//! use sheet_loader::config::{ImportConfig, StorageConfig};
//! use sheet_loader::database::DuckDbConnector;
//! use sheet_loader::import::Importer;
//! use std::path::Path;
//!
//! let connector = DuckDbConnector::open(&StorageConfig::new("sales.duckdb"))?;
//! let importer = Importer::new(ImportConfig::default());
//! let report = importer.import_file(&connector, Path::new("sales.xlsx"), None)?;
//! println!("{}: {} of {} rows", report.message, report.inserted, report.total);
//! # Ok::<(), sheet_loader::SheetLoaderError>(())
//! ```
pub mod config;
pub mod database;
pub mod error;
pub mod import;
pub mod logging;
pub mod spreadsheet;

mod helpers;

pub use error::SheetLoaderError;
pub use import::{ImportReport, Importer, RowError};

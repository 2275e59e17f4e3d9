//! Explicit configuration handed to the storage connector and the importer.
//!
//! Values are resolved by the binary in priority order: command-line argument,
//! then environment variable, then the built-in default.
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

/// Database path meaning a private in-memory database.
pub const MEMORY_DATABASE: &str = ":memory:";
/// Environment variable holding the database path.
pub const DATABASE_ENV: &str = "SHEET_LOADER_DATABASE";
/// Environment variable holding the target table name.
pub const TABLE_ENV: &str = "SHEET_LOADER_TABLE";

/// Where imported tables are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// A DuckDB database file, or [`MEMORY_DATABASE`]
    pub database: PathBuf,
}

impl StorageConfig {
    pub fn new<P: Into<PathBuf>>(database: P) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MEMORY_DATABASE)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database.as_os_str() == MEMORY_DATABASE
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// How a sheet is turned into rows of the target table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportConfig {
    /// Table name hint that wins over the file name
    pub default_table: Option<String>,
    /// Drop fully empty rows before import
    pub skip_empty_rows: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_table: None,
            skip_empty_rows: true,
        }
    }
}

impl ImportConfig {
    /// The raw table hint: the configured name if any, else the stem of the source file.
    pub fn table_hint(&self, source: Option<&Path>) -> Option<String> {
        if let Some(table) = self.default_table.as_deref().filter(|table| !table.trim().is_empty()) {
            return Some(table.to_owned());
        }
        source
            .and_then(Path::file_stem)
            .and_then(OsStr::to_str)
            .map(str::to_owned)
    }
}

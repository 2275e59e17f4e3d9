//! Schema-level building blocks: identifiers, inferred columns and the storage seam.
pub mod column;
pub mod duck;
pub mod identifier;
pub mod storage;

#[cfg(test)]
pub(crate) mod memory;

pub use column::{ColumnSpec, ColumnType};
pub use duck::{DuckDbConnector, DuckDbStorage};
pub use identifier::Identifier;
pub use storage::{Connector, InsertStatement, SqlValue, Storage, StorageError};

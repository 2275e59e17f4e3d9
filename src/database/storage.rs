use crate::database::column::ColumnSpec;
use crate::database::identifier::Identifier;
use crate::error::SheetLoaderError;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Insert into {table} expects {expected} values, got {actual}")]
    ArityMismatch {
        table: Identifier,
        expected: usize,
        actual: usize,
    },

    #[error("No transaction in progress")]
    NoTransaction,

    #[error("Transaction was aborted and could not be restored: {0}")]
    TransactionAborted(String),

    #[error("Storage connection is poisoned")]
    Poisoned,
}

/// A typed value bound to one insert placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Number(f64),
    Timestamp(NaiveDateTime),
}

/// A parameterized insert, built once per import and executed for every row.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertStatement {
    table: Identifier,
    columns: Vec<Identifier>,
    sql: String,
}

impl InsertStatement {
    /// Lists the columns in header order with one positional placeholder each.
    pub fn new(table: &Identifier, columns: &[ColumnSpec]) -> Self {
        let columns: Vec<Identifier> = columns.iter().map(|column| column.name.clone()).collect();
        let names = columns.iter().map(Identifier::quoted).collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO {} ({}) VALUES ({})", table.quoted(), names, placeholders);
        Self {
            table: table.clone(),
            columns,
            sql,
        }
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn columns(&self) -> &[Identifier] {
        &self.columns
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn check_arity(&self, values: &[SqlValue]) -> Result<(), SheetLoaderError> {
        if values.len() == self.columns.len() {
            Ok(())
        } else {
            Err(StorageError::ArityMismatch {
                table: self.table.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            }
            .into())
        }
    }
}

/// One exclusively-owned session on the relational store.
///
/// Writes happen between [`Storage::begin`] and [`Storage::commit`]; a session
/// dropped without commit loses its pending writes.
pub trait Storage {
    fn begin(&mut self) -> Result<(), SheetLoaderError>;

    /// Whether a table with this name exists in the current schema, ignoring case.
    fn table_exists(&mut self, table: &Identifier) -> Result<bool, SheetLoaderError>;

    /// Column names of an existing table in declaration order, uppercased but not sanitized.
    fn list_columns(&mut self, table: &Identifier) -> Result<Vec<Identifier>, SheetLoaderError>;

    fn create_table(&mut self, table: &Identifier, columns: &[ColumnSpec]) -> Result<(), SheetLoaderError>;

    /// Executes `statement` with one value per column.
    ///
    /// A failed insert only loses its own row: the transaction stays usable and keeps
    /// every write made since [`Storage::begin`].
    fn insert_row(&mut self, statement: &InsertStatement, values: &[SqlValue]) -> Result<(), SheetLoaderError>;

    fn commit(&mut self) -> Result<(), SheetLoaderError>;

    fn rollback(&mut self) -> Result<(), SheetLoaderError>;
}

/// Hands out one fresh storage session per import.
pub trait Connector {
    type Storage: Storage;

    fn connect(&self) -> Result<Self::Storage, SheetLoaderError>;
}

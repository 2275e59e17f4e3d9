use crate::database::column::ColumnSpec;
use crate::database::column::ColumnType;
use crate::database::identifier::Identifier;
use crate::database::storage::Connector;
use crate::database::storage::InsertStatement;
use crate::database::storage::SqlValue;
use crate::database::storage::Storage;
use crate::database::storage::StorageError;
use crate::error::SheetLoaderError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryTable {
    pub(crate) columns: Vec<ColumnSpec>,
    pub(crate) rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) tables: BTreeMap<Identifier, MemoryTable>,
    snapshot: Option<BTreeMap<Identifier, MemoryTable>>,
    /// Every storage call, in order
    pub(crate) calls: Vec<String>,
    pub(crate) fail_metadata: bool,
    pub(crate) fail_create: bool,
    pub(crate) fail_commit: bool,
    /// Inserts binding this text fail like a constraint violation; the transaction
    /// survives, as `DuckDbStorage` restores it after such a failure
    pub(crate) reject_text: Option<String>,
}

/// Storage double sharing one state between all sessions it hands out.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub(crate) fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_table(self, name: &str, columns: &[&str]) -> Self {
        let columns = columns
            .iter()
            .map(|column| ColumnSpec::new(Identifier::column(Some(column)), ColumnType::Text, Some(10)))
            .collect();
        self.state().tables.insert(
            Identifier::table(Some(name)),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
        self
    }

    pub(crate) fn table(&self, name: &str) -> Option<MemoryTable> {
        self.state().tables.get(&Identifier::table(Some(name))).cloned()
    }

    fn record(&self, call: String) -> MutexGuard<'_, MemoryState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn failure(message: &str) -> SheetLoaderError {
    SheetLoaderError::WithContextError(message.to_owned())
}

impl Storage for MemoryStorage {
    fn begin(&mut self) -> Result<(), SheetLoaderError> {
        let mut state = self.record("begin".to_owned());
        let tables = state.tables.clone();
        state.snapshot = Some(tables);
        Ok(())
    }

    fn table_exists(&mut self, table: &Identifier) -> Result<bool, SheetLoaderError> {
        let state = self.record(format!("table_exists {}", table));
        if state.fail_metadata {
            return Err(failure("metadata unavailable"));
        }
        Ok(state.tables.contains_key(table))
    }

    fn list_columns(&mut self, table: &Identifier) -> Result<Vec<Identifier>, SheetLoaderError> {
        let state = self.record(format!("list_columns {}", table));
        if state.fail_metadata {
            return Err(failure("metadata unavailable"));
        }
        Ok(state
            .tables
            .get(table)
            .map(|table| table.columns.iter().map(|column| column.name.clone()).collect())
            .unwrap_or_default())
    }

    fn create_table(&mut self, table: &Identifier, columns: &[ColumnSpec]) -> Result<(), SheetLoaderError> {
        let mut state = self.record(format!("create_table {}", table));
        if state.fail_create || state.tables.contains_key(table) {
            return Err(failure("table cannot be created"));
        }
        let columns = columns.to_vec();
        state.tables.insert(
            table.clone(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn insert_row(&mut self, statement: &InsertStatement, values: &[SqlValue]) -> Result<(), SheetLoaderError> {
        statement.check_arity(values)?;
        let mut state = self.record(format!("insert_row {}", statement.table()));
        if let Some(rejected) = state.reject_text.clone() {
            if values.contains(&SqlValue::Text(rejected)) {
                return Err(failure("constraint violated"));
            }
        }
        let table = state
            .tables
            .get_mut(statement.table())
            .ok_or_else(|| failure("no such table"))?;
        table.rows.push(values.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SheetLoaderError> {
        let mut state = self.record("commit".to_owned());
        if state.snapshot.is_none() {
            return Err(StorageError::NoTransaction.into());
        }
        if state.fail_commit {
            return Err(failure("commit refused"));
        }
        state.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SheetLoaderError> {
        let mut state = self.record("rollback".to_owned());
        let snapshot = state.snapshot.take().ok_or(StorageError::NoTransaction)?;
        state.tables = snapshot;
        Ok(())
    }
}

impl Connector for MemoryStorage {
    type Storage = MemoryStorage;

    fn connect(&self) -> Result<MemoryStorage, SheetLoaderError> {
        self.state().calls.push("connect".to_owned());
        Ok(self.clone())
    }
}

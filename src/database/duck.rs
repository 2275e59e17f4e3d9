use crate::config::StorageConfig;
use crate::database::column::ColumnSpec;
use crate::database::column::ColumnType;
use crate::database::identifier::Identifier;
use crate::database::storage::Connector;
use crate::database::storage::InsertStatement;
use crate::database::storage::SqlValue;
use crate::database::storage::Storage;
use crate::database::storage::StorageError;
use crate::error::ResultMessage;
use crate::error::SheetLoaderError;
use duckdb::params_from_iter;
use duckdb::types::TimeUnit;
use duckdb::types::Value;
use duckdb::Connection;
use std::sync::Arc;
use std::sync::Mutex;

const TABLE_EXISTS_SQL: &str = "SELECT count(*) FROM information_schema.tables \
     WHERE table_schema = current_schema() AND lower(table_name) = lower(?)";

const LIST_COLUMNS_SQL: &str = "SELECT column_name FROM information_schema.columns \
     WHERE table_schema = current_schema() AND lower(table_name) = lower(?) \
     ORDER BY ordinal_position";

/// Opens the configured database once and clones a connection per import.
pub struct DuckDbConnector {
    root: Arc<Mutex<Connection>>,
}

impl DuckDbConnector {
    pub fn open(config: &StorageConfig) -> Result<Self, SheetLoaderError> {
        let connection = if config.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.database)
        };
        let connection = connection
            .map_err(SheetLoaderError::from)
            .with_prefix(&format!("open database {}", config.database.display()))?;
        tracing::debug!(database = %config.database.display(), "Opened DuckDB database");
        Ok(Self {
            root: Arc::new(Mutex::new(connection)),
        })
    }
}

impl Connector for DuckDbConnector {
    type Storage = DuckDbStorage;

    fn connect(&self) -> Result<DuckDbStorage, SheetLoaderError> {
        let connection = self.root.lock().map_err(|_| StorageError::Poisoned)?.try_clone()?;
        let mut storage = DuckDbStorage::new(connection);
        storage._root = Some(Arc::clone(&self.root));
        Ok(storage)
    }
}

/// A write made since `BEGIN`.
enum Journal {
    Batch(String),
    Insert(String, Vec<SqlValue>),
}

/// A DuckDB session owned by one import.
///
/// DuckDB aborts the whole transaction on the first failed statement. The session
/// journals its writes and, after a failed insert, rolls back, begins again and
/// replays them so that only the failed row is lost.
pub struct DuckDbStorage {
    connection: Connection,
    in_transaction: bool,
    aborted: Option<String>,
    journal: Vec<Journal>,
    // Cloned connections borrow the database of the root; it must be dropped after them.
    _root: Option<Arc<Mutex<Connection>>>,
}

impl DuckDbStorage {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            in_transaction: false,
            aborted: None,
            journal: Vec::new(),
            _root: None,
        }
    }

    /// The underlying connection, for queries outside the import pipeline.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn execute_insert(&self, sql: &str, values: &[SqlValue]) -> Result<(), SheetLoaderError> {
        let mut prepared = self.connection.prepare_cached(sql)?;
        prepared.execute(params_from_iter(values.iter().map(to_duckdb_value)))?;
        Ok(())
    }

    fn restore(&self) -> Result<(), SheetLoaderError> {
        self.connection.execute_batch("ROLLBACK")?;
        self.connection.flush_prepared_statement_cache();
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        for entry in &self.journal {
            match entry {
                Journal::Batch(sql) => self.connection.execute_batch(sql)?,
                Journal::Insert(sql, values) => self.execute_insert(sql, values)?,
            }
        }
        tracing::debug!(writes = self.journal.len(), "Restored transaction after a failed insert");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SheetLoaderError> {
        if !self.in_transaction {
            return Err(StorageError::NoTransaction.into());
        }
        self.in_transaction = false;
        self.journal.clear();
        Ok(())
    }
}

impl Storage for DuckDbStorage {
    fn begin(&mut self) -> Result<(), SheetLoaderError> {
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        self.in_transaction = true;
        self.aborted = None;
        self.journal.clear();
        Ok(())
    }

    fn table_exists(&mut self, table: &Identifier) -> Result<bool, SheetLoaderError> {
        let count: i64 = self
            .connection
            .query_row(TABLE_EXISTS_SQL, [table.as_str()], |row| row.get(0))
            .map_err(SheetLoaderError::from)
            .with_prefix(&format!("look up table {}", table))?;
        Ok(count > 0)
    }

    fn list_columns(&mut self, table: &Identifier) -> Result<Vec<Identifier>, SheetLoaderError> {
        let mut statement = self.connection.prepare(LIST_COLUMNS_SQL)?;
        let names = statement
            .query_map([table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(SheetLoaderError::from)
            .with_prefix(&format!("list columns of {}", table))?;
        Ok(names.iter().map(|name| Identifier::existing(name)).collect())
    }

    fn create_table(&mut self, table: &Identifier, columns: &[ColumnSpec]) -> Result<(), SheetLoaderError> {
        let sql = create_table_sql(table, columns);
        tracing::debug!(%sql, "Creating table");
        self.connection
            .execute_batch(&sql)
            .map_err(SheetLoaderError::from)
            .with_prefix(&format!("create table {}", table.quoted()))?;
        if self.in_transaction {
            self.journal.push(Journal::Batch(sql));
        }
        Ok(())
    }

    fn insert_row(&mut self, statement: &InsertStatement, values: &[SqlValue]) -> Result<(), SheetLoaderError> {
        statement.check_arity(values)?;
        if let Some(reason) = &self.aborted {
            return Err(StorageError::TransactionAborted(reason.clone()).into());
        }
        match self.execute_insert(statement.sql(), values) {
            Ok(()) => {
                if self.in_transaction {
                    self.journal.push(Journal::Insert(statement.sql().to_owned(), values.to_vec()));
                }
                Ok(())
            }
            Err(error) => {
                if self.in_transaction {
                    if let Err(restore) = self.restore() {
                        tracing::error!("Cannot restore transaction: {}", restore);
                        self.aborted = Some(restore.to_string());
                    }
                }
                Err(error)
            }
        }
    }

    fn commit(&mut self) -> Result<(), SheetLoaderError> {
        self.finish()?;
        if let Some(reason) = self.aborted.take() {
            if let Err(error) = self.connection.execute_batch("ROLLBACK") {
                tracing::debug!("Rollback of aborted transaction: {}", error);
            }
            return Err(StorageError::TransactionAborted(reason).into());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(SheetLoaderError::from)
            .with_prefix("commit")
    }

    fn rollback(&mut self) -> Result<(), SheetLoaderError> {
        self.finish()?;
        self.aborted = None;
        self.connection.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Renders the DuckDB type of one column.
pub fn column_type_sql(column: &ColumnSpec) -> String {
    match column.kind {
        ColumnType::Text => format!("VARCHAR({})", column.capacity.unwrap_or(ColumnType::MAX_TEXT_CAPACITY)),
        ColumnType::Number => "DOUBLE".to_owned(),
        ColumnType::Date => "TIMESTAMP".to_owned(),
    }
}

/// Renders `CREATE TABLE` with columns in header order.
pub fn create_table_sql(table: &Identifier, columns: &[ColumnSpec]) -> String {
    let definitions = columns
        .iter()
        .map(|column| format!("{} {}", column.name.quoted(), column_type_sql(column)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", table.quoted(), definitions)
}

fn to_duckdb_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Text(text) => Value::Text(text.clone()),
        SqlValue::Number(number) => Value::Double(*number),
        SqlValue::Timestamp(datetime) => Value::Timestamp(TimeUnit::Microsecond, datetime.and_utc().timestamp_micros()),
    }
}

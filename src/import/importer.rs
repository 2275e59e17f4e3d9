use crate::config::ImportConfig;
use crate::database::ColumnSpec;
use crate::database::Connector;
use crate::database::Identifier;
use crate::database::Storage;
use crate::error::ResultMessage;
use crate::error::SheetLoaderError;
use crate::import::load;
use crate::import::resolve;
use crate::import::ImportError;
use crate::import::ImportReport;
use crate::import::NameLocks;
use crate::spreadsheet;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::ReadOptions;
use crate::spreadsheet::Sheet;
use std::collections::HashMap;
use std::path::Path;

/// Sanitizes the header row and infers one column per header cell.
///
/// Fails on an empty sheet, an empty header row, or two headers sanitizing to the same name.
pub fn plan_columns(sheet: &Sheet) -> Result<Vec<ColumnSpec>, SheetLoaderError> {
    let header = sheet.header().ok_or(ImportError::EmptySheet)?;
    if header.is_empty() {
        return Err(ImportError::NoColumns.into());
    }

    let names: Vec<Identifier> = header.iter().map(header_name).collect();
    let mut seen: HashMap<&Identifier, usize> = HashMap::new();
    for (position, name) in names.iter().enumerate() {
        if let Some(first) = seen.insert(name, position) {
            return Err(ImportError::DuplicateColumn {
                name: name.clone(),
                first: first + 1,
                second: position + 1,
            }
            .into());
        }
    }

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(col, name)| ColumnSpec::infer(name, sheet.column(col)))
        .collect())
}

fn header_name(cell: &CellValue) -> Identifier {
    match cell {
        CellValue::Absent => Identifier::column(None),
        other => Identifier::column(Some(&other.to_string())),
    }
}

/// Runs imports against storage sessions handed out by a [`Connector`].
///
/// One importer may be shared between threads; imports proposing the same
/// table name run one after the other.
#[derive(Debug, Default)]
pub struct Importer {
    config: ImportConfig,
    locks: NameLocks,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            locks: NameLocks::new(),
        }
    }

    /// Reads a worksheet from `path` and imports it, naming the table after the
    /// configured table or else the file.
    pub fn import_file<C: Connector + ?Sized>(
        &self,
        connector: &C,
        path: &Path,
        sheet_name: Option<&str>,
    ) -> Result<ImportReport, SheetLoaderError> {
        let options = ReadOptions {
            sheet_name: sheet_name.map(str::to_owned),
            skip_empty_rows: self.config.skip_empty_rows,
        };
        let sheet = spreadsheet::read_sheet(path, &options).with_prefix(&format!("read {}", path.display()))?;
        let hint = self.config.table_hint(Some(path));
        self.import_sheet(connector, &sheet, hint.as_deref())
    }

    /// Imports one sheet into the table proposed by `hint`.
    ///
    /// Nothing touches storage until the header has been validated. Any failure past
    /// that point rolls the session back and no report is produced.
    pub fn import_sheet<C: Connector + ?Sized>(
        &self,
        connector: &C,
        sheet: &Sheet,
        hint: Option<&str>,
    ) -> Result<ImportReport, SheetLoaderError> {
        let columns = plan_columns(sheet)?;
        let proposed = Identifier::table(hint);
        for column in &columns {
            tracing::debug!(table = %proposed, column = %column.name, kind = %column.kind, capacity = ?column.capacity, "Inferred column");
        }

        let mut storage = connector.connect().with_prefix("connect to storage")?;
        let _guard = self.locks.acquire(&proposed)?;
        storage.begin()?;

        match Self::write(&mut storage, &proposed, &columns, sheet) {
            Ok(report) => {
                tracing::info!(
                    table = %report.table_name,
                    inserted = report.inserted,
                    total = report.total,
                    "{}",
                    report.message
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = storage.rollback() {
                    tracing::debug!("Rollback after failed import: {}", rollback);
                }
                tracing::error!(table = %proposed, "Import failed: {}", e);
                Err(e)
            }
        }
    }

    fn write<S: Storage>(
        storage: &mut S,
        proposed: &Identifier,
        columns: &[ColumnSpec],
        sheet: &Sheet,
    ) -> Result<ImportReport, SheetLoaderError> {
        let names: Vec<Identifier> = columns.iter().map(|column| column.name.clone()).collect();
        let target = resolve(storage, proposed, &names)?;
        load(storage, &target, columns, sheet.data_rows())
    }
}

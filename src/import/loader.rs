use crate::database::ColumnSpec;
use crate::database::ColumnType;
use crate::database::InsertStatement;
use crate::database::SqlValue;
use crate::database::Storage;
use crate::error::ResultMessage;
use crate::error::SheetLoaderError;
use crate::import::ImportReport;
use crate::import::RowError;
use crate::import::TableTarget;
use crate::spreadsheet::cell_at;
use crate::spreadsheet::CellValue;

/// Converts one cell to the bound value of its column.
///
/// Absent cells are null whatever the column type.
pub fn coerce(value: &CellValue, column: &ColumnSpec) -> Result<SqlValue, String> {
    if value.is_absent() {
        return Ok(SqlValue::Null);
    }
    match column.kind {
        ColumnType::Date => value
            .as_date()
            .map(SqlValue::Timestamp)
            .ok_or_else(|| format!("Invalid date '{}' for column {}", value, column.name)),
        ColumnType::Number => value
            .as_number()
            .filter(|number| number.is_finite())
            .map(SqlValue::Number)
            .ok_or_else(|| format!("Invalid number '{}' for column {}", value, column.name)),
        ColumnType::Text => Ok(SqlValue::Text(value.to_string())),
    }
}

fn coerce_row(row: &[CellValue], columns: &[ColumnSpec]) -> Result<Vec<SqlValue>, String> {
    columns
        .iter()
        .enumerate()
        .map(|(col, column)| coerce(cell_at(row, col), column))
        .collect()
}

/// Writes the data rows into `target` and commits once.
///
/// The table is created first when the target is new. A row whose cells cannot be
/// coerced, or whose insert fails, is reported and skipped; the remaining rows are
/// still attempted and the commit happens whatever the number of failed rows.
pub fn load<S: Storage + ?Sized>(
    storage: &mut S,
    target: &TableTarget,
    columns: &[ColumnSpec],
    rows: &[Vec<CellValue>],
) -> Result<ImportReport, SheetLoaderError> {
    if target.is_new() {
        storage.create_table(&target.name, columns)?;
        tracing::info!(table = %target.name, columns = columns.len(), "Created table");
    }

    let statement = InsertStatement::new(&target.name, columns);
    let errors = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let outcome = coerce_row(row, columns)
                .and_then(|values| storage.insert_row(&statement, &values).map_err(|e| e.to_string()));
            (index + 1, outcome)
        })
        .fold(Vec::new(), |mut errors, (row, outcome)| {
            if let Err(message) = outcome {
                tracing::warn!(table = %target.name, row, "Row rejected: {}", message);
                errors.push(RowError { row, message });
            }
            errors
        });

    storage.commit().with_prefix(&format!("commit into {}", target.name))?;
    Ok(ImportReport::new(target.name.clone(), target.is_new(), rows.len(), errors))
}

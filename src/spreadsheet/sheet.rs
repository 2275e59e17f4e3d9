use crate::spreadsheet::cell::CellValue;

/// A worksheet loaded into memory as a ragged grid.
/// Row 0 is the header row, every following row is a data row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    /// Sheet name
    pub name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.to_owned(),
            rows,
        }
    }

    /// Returns true if the sheet has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[CellValue]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Iterates one column of the data rows; cells missing from ragged rows are absent.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.data_rows().iter().map(move |row| cell_at(row, col))
    }

    /// First `limit` rows, header included.
    pub fn preview(&self, limit: usize) -> &[Vec<CellValue>] {
        &self.rows[..limit.min(self.rows.len())]
    }
}

/// Cell of a ragged row, absent past its end.
pub fn cell_at(row: &[CellValue], col: usize) -> &CellValue {
    const ABSENT: &CellValue = &CellValue::Absent;
    row.get(col).unwrap_or(ABSENT)
}

/// Accumulates positioned cells into a dense grid anchored at the first used row and column.
pub(crate) struct SheetBuilder {
    name: String,
    skip_empty_rows: bool,
    cells: Vec<(usize, usize, CellValue)>,
    row_lower_bound: Option<usize>,
    col_lower_bound: Option<usize>,
}

impl SheetBuilder {
    pub(crate) fn new(name: &str, skip_empty_rows: bool) -> Self {
        Self {
            name: name.to_owned(),
            skip_empty_rows,
            cells: Vec::new(),
            row_lower_bound: None,
            col_lower_bound: None,
        }
    }

    /// Adds a non-absent cell; absent cells only stretch rows when later cells exist.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        if value.is_absent() {
            return;
        }
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        self.cells.push((row, col, value));
    }

    pub(crate) fn finish(self) -> Sheet {
        let (Some(row_lower), Some(col_lower)) = (self.row_lower_bound, self.col_lower_bound) else {
            return Sheet::new(&self.name, Vec::new());
        };
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for (row, col, value) in self.cells {
            let (row, col) = (row - row_lower, col - col_lower);
            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            let record = &mut rows[row];
            if record.len() <= col {
                record.resize(col + 1, CellValue::Absent);
            }
            record[col] = value;
        }
        if self.skip_empty_rows {
            rows.retain(|row| !row.is_empty());
        }
        Sheet::new(&self.name, rows)
    }
}

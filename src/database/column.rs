use crate::database::identifier::Identifier;
use crate::spreadsheet::CellValue;
use serde::Serialize;
use std::fmt::Display;

/// Storage types a spreadsheet column can be inferred as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Variable-length strings with a sized capacity
    Text,
    /// Double-precision floating point numbers
    Number,
    /// Date and time
    Date,
}

/// A column of the target table: sanitized name, inferred type and text capacity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: Identifier,
    pub kind: ColumnType,
    /// Character capacity, only for [`ColumnType::Text`]
    pub capacity: Option<usize>,
}

impl ColumnType {
    /// Largest text capacity ever declared.
    pub const MAX_TEXT_CAPACITY: usize = 4000;

    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
        }
    }

    /// Decides a column type from its samples in one pass.
    ///
    /// A column stays a date candidate while every value is a date or parses as one,
    /// and a number candidate while every value parses as a float; the scan stops once
    /// neither holds. Dates win over numbers, numbers over text. Text capacity is twice
    /// the longest rendered value, clamped to `1..=4000`.
    ///
    /// A column without any value is text at full capacity.
    pub fn infer<'a, I>(samples: I) -> (ColumnType, Option<usize>)
    where
        I: IntoIterator<Item = &'a CellValue>,
    {
        let mut is_date = true;
        let mut is_number = true;
        let mut has_value = false;
        let mut max_length = 0usize;
        for sample in samples.into_iter().filter(|sample| !sample.is_absent()) {
            has_value = true;
            max_length = max_length.max(sample.to_string().chars().count());
            if is_date && sample.as_date().is_none() {
                is_date = false;
            }
            if is_number && sample.as_number().is_none() {
                is_number = false;
            }
            if !is_date && !is_number {
                break;
            }
        }

        if !has_value {
            (ColumnType::Text, Some(Self::MAX_TEXT_CAPACITY))
        } else if is_date {
            (ColumnType::Date, None)
        } else if is_number {
            (ColumnType::Number, None)
        } else {
            (ColumnType::Text, Some((max_length * 2).clamp(1, Self::MAX_TEXT_CAPACITY)))
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ColumnSpec {
    pub fn new(name: Identifier, kind: ColumnType, capacity: Option<usize>) -> Self {
        Self { name, kind, capacity }
    }

    /// Builds the spec of one column from its header name and samples.
    pub fn infer<'a, I>(name: Identifier, samples: I) -> Self
    where
        I: IntoIterator<Item = &'a CellValue>,
    {
        let (kind, capacity) = ColumnType::infer(samples);
        Self::new(name, kind, capacity)
    }
}

use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Date and datetime layouts accepted when a text cell is read as a date.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];

/// A single untyped value from the sheet grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Absent,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Reads the value as a date: date cells as-is, anything else through its string rendering.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Absent => None,
            CellValue::Date(value) => Some(*value),
            other => parse_date(&other.to_string()),
        }
    }

    /// Reads the value as a number: numbers as-is, text after normalizing a comma decimal separator.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Absent => None,
            CellValue::Number(value) => Some(*value),
            other => parse_number(&other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Absent => Ok(()),
            CellValue::Text(value) => write!(f, "{}", value),
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Date(value) if value.time() == NaiveTime::MIN => write!(f, "{}", value.format("%Y-%m-%d")),
            CellValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Parses a date or datetime string in one of the accepted layouts.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Parses a floating-point number, accepting a comma as decimal separator.
/// Non-finite results are rejected.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let normalized = if value.contains(',') && !value.contains('.') {
        value.replacen(',', ".", 1)
    } else {
        value.to_owned()
    };
    normalized.parse::<f64>().ok().filter(|number| number.is_finite())
}

/// How the xlsx reader must interpret the raw text of a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as 0/1
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as serial numbers from the 1900 epoch
    NumberDateTime1900,
    /// Date/time values stored as serial numbers from the 1904 epoch
    NumberDateTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    /// Maps built-in Excel number format IDs to a cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47" => {
                Some(Self::datetime(is_1904))
            }
            _ => None,
        }
    }

    /// Inspects a custom number format code for date or time tokens.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_color = false;
        let mut is_datetime = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => is_datetime = true,
                _ => (),
            }
        }

        if is_datetime {
            Self::datetime(is_1904)
        } else {
            Self::Number
        }
    }

    fn datetime(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDateTime1904
        } else {
            Self::NumberDateTime1900
        }
    }
}

/// Converts an Excel serial date number to a datetime.
/// Serials below 60 in the 1900 system are shifted for the Lotus 1-2-3 leap year bug.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days + offset))?
        .checked_add_signed(Duration::milliseconds(milliseconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn display_renders_like_the_source_grid() {
        assert_eq!(CellValue::Absent.to_string(), "");
        assert_eq!(CellValue::from("Alice").to_string(), "Alice");
        assert_eq!(CellValue::Number(10.0).to_string(), "10");
        assert_eq!(CellValue::Number(20.5).to_string(), "20.5");
        assert_eq!(CellValue::Date(datetime(2024, 3, 1, 0, 0, 0)).to_string(), "2024-03-01");
        assert_eq!(CellValue::Date(datetime(2024, 3, 1, 13, 5, 9)).to_string(), "2024-03-01 13:05:09");
    }

    #[test]
    fn parse_number_accepts_comma_decimal() {
        assert_eq!(parse_number("20,5"), Some(20.5));
        assert_eq!(parse_number(" 10 "), Some(10.0));
        assert_eq!(parse_number("-3.25e2"), Some(-325.0));
        assert_eq!(parse_number("1,000.5"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn parse_date_accepts_common_layouts() {
        let midnight = datetime(2024, 3, 1, 0, 0, 0);
        assert_eq!(parse_date("2024-03-01"), Some(midnight));
        assert_eq!(parse_date("2024/03/01"), Some(midnight));
        assert_eq!(parse_date("01/03/2024"), Some(midnight));
        assert_eq!(parse_date("01.03.2024"), Some(midnight));
        assert_eq!(parse_date("2024-03-01 13:05:09"), Some(datetime(2024, 3, 1, 13, 5, 9)));
        assert_eq!(parse_date("2024-03-01T13:05"), Some(datetime(2024, 3, 1, 13, 5, 0)));
        assert_eq!(parse_date("2024-03-01T13:05:09Z"), Some(datetime(2024, 3, 1, 13, 5, 9)));
    }

    #[test]
    fn parse_date_rejects_numbers_and_garbage() {
        assert_eq!(parse_date("10"), None);
        assert_eq!(parse_date("20,5"), None);
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date("Alice"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn value_conversions() {
        let date = datetime(2024, 3, 1, 0, 0, 0);
        assert_eq!(CellValue::Date(date).as_date(), Some(date));
        assert_eq!(CellValue::from("2024-03-01").as_date(), Some(date));
        assert_eq!(CellValue::Number(45352.0).as_date(), None);
        assert_eq!(CellValue::Date(date).as_number(), None);
        assert_eq!(CellValue::from("20,5").as_number(), Some(20.5));
        assert_eq!(CellValue::Absent.as_number(), None);
        assert_eq!(CellValue::from(None::<f64>), CellValue::Absent);
    }

    #[test]
    fn serial_dates_in_both_systems() {
        assert_eq!(serial_to_datetime(45352.0, false), Some(datetime(2024, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45352.5, false), Some(datetime(2024, 3, 1, 12, 0, 0)));
        assert_eq!(serial_to_datetime(1.0, false), Some(datetime(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(0.0, true), Some(datetime(1904, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(-1.0, false), None);
    }

    #[test]
    fn number_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDateTime1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm", true), CellType::NumberDateTime1904);
        assert_eq!(CellType::parse_custom_number_format("0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0.00\" days\"", false), CellType::Number);
    }
}

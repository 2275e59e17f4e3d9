//! Conversions between A1-style cell references and 0-based indexes.

/// Converts a column label such as `A` or `AB` to a 0-based column index.
pub(crate) fn col_to_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for character in label.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        let digit = (character.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Converts a 1-based row label to a 0-based row index.
pub(crate) fn row_to_index(label: &str) -> Option<usize> {
    label.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Splits a reference such as `B12` into 0-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    Some((row_to_index(row)?, col_to_index(col)?))
}

/// Renders 0-based `(row, col)` as an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut label = String::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        label.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    format!("{}{}", label, row + 1)
}

//! Writes small `.xlsx` workbooks to disk for end-to-end tests.
#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub enum Cell {
    Text(&'static str),
    Number(f64),
    /// Excel serial date shown through the built-in `m/d/yyyy` format
    Date(f64),
    Empty,
}

pub use Cell::*;

fn column_name(col: usize) -> String {
    let mut name = String::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::new();
    for (row_index, row) in rows.iter().enumerate() {
        let r = row_index + 1;
        xml.push_str(&format!(r#"<row r="{r}">"#));
        for (col, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(col), r);
            match cell {
                Text(value) => xml.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)),
                Number(value) => xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#)),
                Date(serial) => xml.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#)),
                Empty => {}
            }
        }
        xml.push_str("</row>");
    }
    xml
}

/// Writes `sheets` as a workbook at `dir/name` and returns its path.
pub fn write_workbook(dir: &Path, name: &str, sheets: &[(&str, Vec<Vec<Cell>>)]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();

    let mut relationships = String::new();
    let mut entries = String::new();
    for (index, (sheet_name, rows)) in sheets.iter().enumerate() {
        let id = index + 1;
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
        entries.push_str(&format!(r#"<sheet name="{sheet_name}" sheetId="{id}" r:id="rId{id}"/>"#));
        zip.start_file(format!("xl/worksheets/sheet{id}.xml"), options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            sheet_xml(rows)
        )
        .unwrap();
    }

    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
    )
    .unwrap();

    zip.start_file("xl/workbook.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{entries}</sheets></workbook>"#
    )
    .unwrap();

    zip.start_file("xl/styles.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#
    )
    .unwrap();

    zip.finish().unwrap();
    path
}

/// The classic two-column sales sheet.
pub fn sales_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![Text("Name"), Text("Amount")],
        vec![Text("Alice"), Text("10")],
        vec![Text("Bob"), Text("20,5")],
    ]
}

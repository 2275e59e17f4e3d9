//! Builds minimal `.xlsx` packages in memory for reader tests.

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

#[derive(Default)]
pub(crate) struct WorkbookFixture {
    sheets: Vec<(String, String)>,
    shared_strings: Option<Vec<String>>,
    styles: Option<String>,
}

impl WorkbookFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a worksheet whose `<sheetData>` content is `rows`.
    pub(crate) fn sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push((name.to_owned(), rows.to_owned()));
        self
    }

    /// Shared string items, already XML-escaped.
    pub(crate) fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = Some(strings.iter().map(|it| it.to_string()).collect());
        self
    }

    /// Inner content of `<styleSheet>`.
    pub(crate) fn styles(mut self, styles: &str) -> Self {
        self.styles = Some(styles.to_owned());
        self
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut put = |name: &str, content: String| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        let mut relationships = String::new();
        let mut sheets = String::new();
        for (index, (name, rows)) in self.sheets.iter().enumerate() {
            let id = index + 1;
            relationships.push_str(&format!(
                r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
            ));
            sheets.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
            put(
                &format!("xl/worksheets/sheet{id}.xml"),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
                ),
            );
        }
        put(
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
            ),
        );
        put(
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets}</sheets></workbook>"#
            ),
        );
        if let Some(strings) = &self.shared_strings {
            let items: String = strings.iter().map(|it| format!("<si><t>{it}</t></si>")).collect();
            put(
                "xl/sharedStrings.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{items}</sst>"#
                ),
            );
        }
        if let Some(styles) = &self.styles {
            put(
                "xl/styles.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{styles}</styleSheet>"#
                ),
            );
        }
        zip.finish().unwrap().into_inner()
    }
}

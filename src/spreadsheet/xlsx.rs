use crate::error::SheetLoaderError;
use crate::helpers::xml::attribute_text;
use crate::helpers::xml::push_reference;
use crate::helpers::xml::ElementAttributes;
use crate::helpers::xml::XmlReader;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::serial_to_datetime;
use crate::spreadsheet::cell::parse_date;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::sheet::SheetBuilder;
use crate::spreadsheet::ReadOptions;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use tracing::debug;
use zip::ZipArchive;

// XML tag names of the SpreadsheetML parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";       // Package relationship
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");   // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");     // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");   // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");          // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");    // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");        // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                   // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// An opened `.xlsx` workbook with its shared parts loaded.
pub struct XlsxWorkbook<RS: Read + Seek> {
    zip: ZipArchive<RS>,
    /// Cell type per style index, used to spot date-formatted numbers
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    is_1904: bool,
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    pub fn new(reader: RS) -> Result<Self, SheetLoaderError> {
        let mut zip = ZipArchive::new(reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::NoWorksheet)?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(sheets = sheets.len(), shared_strings = shared_strings.len(), is_1904, "opened workbook");
        Ok(Self {
            zip,
            number_formats,
            sheets,
            shared_strings,
            is_1904,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Reads the first worksheet accepted by `options` into a grid.
    pub fn read_sheet(&mut self, options: &ReadOptions) -> Result<Sheet, SheetLoaderError> {
        let pattern = options.sheet_pattern()?;
        let (sheet_name, zip_path) = self
            .sheets
            .iter()
            .find(|(name, _)| pattern.as_ref().map(|pattern| pattern.matches(name)).unwrap_or(true))
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFound {
                pattern: options.sheet_name.clone().unwrap_or_default(),
                available: self.sheet_names(),
            })?;

        let shared_strings = &self.shared_strings;
        let is_1904 = self.is_1904;
        let mut builder = SheetBuilder::new(&sheet_name, options.skip_empty_rows);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                row_count = event.parsed_attribute::<usize>("r")?
                    .map(|r| r.saturating_sub(1))
                    .unwrap_or(row_count);
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.attribute("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                kind = event.attribute("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if let Some(index) = event.parsed_attribute::<usize>("s")? {
                    if kind == CellType::Number {
                        kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
                value.clear();
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if kind != CellType::Empty && event.name() == TAG_CELL => {
                if !value.is_empty() {
                    let cell = to_cell_value(kind, &value, shared_strings, is_1904).ok_or_else(|| {
                        SpreadsheetError::CellValueError(
                            sheet_name.to_owned(),
                            index_to_reference(row, col),
                            value.to_owned(),
                        )
                    })?;
                    builder.push(row, col, cell);
                }
                kind = CellType::Empty;
                value.clear();
            }
        });
        Ok(builder.finish())
    }
}

/// Converts raw cell text to a grid value according to its storage type.
fn to_cell_value(kind: CellType, value: &str, shared_strings: &[String], is_1904: bool) -> Option<CellValue> {
    let cell = match kind {
        CellType::Empty => CellValue::Absent,
        CellType::Boolean => CellValue::from(if value == "1" { "true" } else { "false" }),
        CellType::Number => CellValue::Number(value.trim().parse::<f64>().ok()?),
        CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
            let serial = value.trim().parse::<f64>().ok()?;
            CellValue::Date(serial_to_datetime(serial, kind == CellType::NumberDateTime1904 || is_1904)?)
        }
        CellType::IsoDateTime => CellValue::Date(parse_date(value)?),
        CellType::SharedString => {
            let index = value.trim().parse::<usize>().ok()?;
            CellValue::from(shared_strings.get(index)?.as_str())
        }
        CellType::InlineString | CellType::Error => CellValue::from(value),
    };
    Some(cell)
}

/// Loads worksheet relationships, mapping relationship IDs to zip paths
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, SheetLoaderError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.attribute("Id")?;
            let kind = event.attribute("Type")?;
            let target = event.attribute("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads the worksheet list and whether the workbook uses the 1904 date system
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), SheetLoaderError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute_text(&attribute)?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute_text(&attribute)?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.attribute("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the cell type of every cell style from styles.xml
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, SheetLoaderError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.attribute("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the whole shared string table
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, SheetLoaderError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Normalizes a relationship target to its path inside the archive
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string content up to `end_tag`, skipping phonetic annotations
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetLoaderError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => push_reference(&mut text, &event)?,
    });
    Ok(text)
}

//! Event reading and attribute access for the XML parts of a workbook

use crate::error::SheetLoaderError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntity(String),

    #[error("Invalid value '{value}' for attribute {name}")]
    InvalidAttribute { name: String, value: String },
}

/// Pull reader over one workbook part; empty elements are reported as start and end events.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// The next event, `None` once the document is exhausted.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetLoaderError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// The unescaped value of an attribute.
pub(crate) fn attribute_text<'a>(attribute: &Attribute<'a>) -> Result<Cow<'a, str>, SheetLoaderError> {
    Ok(attribute.unescape_value()?)
}

/// Named attribute lookup on a start tag.
pub(crate) trait ElementAttributes<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetLoaderError>;

    /// Parses the attribute; an empty value counts as absent.
    fn parsed_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetLoaderError>;
}

impl<'a> ElementAttributes<'a> for BytesStart<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetLoaderError> {
        self.try_get_attribute(name)?.map(|attribute| attribute_text(&attribute)).transpose()
    }

    fn parsed_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetLoaderError> {
        let Some(attribute) = self.try_get_attribute(name)? else {
            return Ok(None);
        };
        let value = attribute_text(&attribute)?;
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some).map_err(|_| {
            XmlError::InvalidAttribute {
                name: name.to_owned(),
                value: value.into_owned(),
            }
            .into()
        })
    }
}

/// Appends the text of an entity or character reference such as `&amp;` or `&#x42;`.
pub(crate) fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), SheetLoaderError> {
    let raw = reference.xml_content()?;
    let code = match raw.strip_prefix('#') {
        Some(hex) if hex.starts_with('x') => Some(u32::from_str_radix(&hex[1..], 16)?),
        Some(decimal) => Some(decimal.parse::<u32>()?),
        None => None,
    };
    match code {
        Some(code) => text.extend(char::from_u32(code)),
        None => text.push_str(resolve_xml_entity(&raw).ok_or_else(|| XmlError::UnknownEntity(raw.to_string()))?),
    }
    Ok(())
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

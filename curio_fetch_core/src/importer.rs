//! Canonical collection XML importer
//!
//! The transform pipeline reduces every XML source to one canonical shape:
//! a `<collection>` root carrying its type, an optional `<fields>` block
//! declaring source-specific fields, and one `<entry>` element per result
//! whose children are named after entry fields. Repeated child elements of
//! the same name become one multi-valued field.

use crate::entry::{Collection, Entry, Field, FieldKind, VALUE_DELIMITER};
use crate::error::{FetchError, Result};
use crate::request::CollectionKind;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parsed canonical XML document
pub struct ImportResult {
    pub collection: Collection,
    pub entries: Vec<Entry>,
}

/// Parse a canonical collection XML document.
pub fn import(xml: &str) -> Result<ImportResult> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut collection: Option<Collection> = None;
    let mut entries = Vec::new();

    let mut in_fields = false;
    let mut current_entry: Option<Entry> = None;
    let mut current_element: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(payload_err)? {
            Event::Start(start) => {
                let name = element_name(&start)?;
                match name.as_str() {
                    "collection" => {
                        collection = Some(collection_from_attrs(&start)?);
                    }
                    "fields" => in_fields = true,
                    "field" if in_fields => {
                        if let Some(coll) = collection.as_mut() {
                            coll.add_field(field_from_attrs(&start)?);
                        }
                    }
                    "entry" => {
                        current_entry = Some(Entry::new());
                    }
                    _ => {
                        if current_entry.is_some() {
                            current_element = Some(name);
                            text.clear();
                        }
                    }
                }
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                if name == "field" && in_fields {
                    if let Some(coll) = collection.as_mut() {
                        coll.add_field(field_from_attrs(&start)?);
                    }
                } else if name == "collection" && collection.is_none() {
                    collection = Some(collection_from_attrs(&start)?);
                }
            }
            Event::Text(t) => {
                if current_element.is_some() {
                    text.push_str(&t.unescape().map_err(payload_err)?);
                }
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                match name.as_str() {
                    "fields" => in_fields = false,
                    "entry" => {
                        if let Some(entry) = current_entry.take() {
                            if !entry.is_empty() {
                                entries.push(entry);
                            }
                        }
                    }
                    _ => {
                        if current_element.as_deref() == Some(name.as_str()) {
                            if let Some(entry) = current_entry.as_mut() {
                                append_value(entry, &name, text.trim());
                            }
                            current_element = None;
                            text.clear();
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let collection =
        collection.ok_or_else(|| FetchError::payload("document has no collection root"))?;
    Ok(ImportResult {
        collection,
        entries,
    })
}

fn append_value(entry: &mut Entry, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    if entry.has_field(name) {
        let joined = format!("{}{VALUE_DELIMITER}{value}", entry.field(name));
        entry.set_field(name, joined);
    } else {
        entry.set_field(name, value);
    }
}

fn collection_from_attrs(start: &BytesStart<'_>) -> Result<Collection> {
    let kind_name = attr_value(start, "type")?
        .ok_or_else(|| FetchError::payload("collection element has no type attribute"))?;
    let kind = CollectionKind::from_name(&kind_name)
        .ok_or_else(|| FetchError::payload(format!("unknown collection type {kind_name:?}")))?;
    Ok(Collection::new(kind))
}

fn field_from_attrs(start: &BytesStart<'_>) -> Result<Field> {
    let name = attr_value(start, "name")?
        .ok_or_else(|| FetchError::payload("field element has no name attribute"))?;
    let title = attr_value(start, "title")?.unwrap_or_else(|| name.clone());
    let kind = match attr_value(start, "type")?.as_deref() {
        Some("para") => FieldKind::Para,
        Some("number") => FieldKind::Number,
        Some("url") => FieldKind::Url,
        Some("table") => FieldKind::Table,
        Some("choice") => FieldKind::Choice,
        Some("date") => FieldKind::Date,
        Some("image") => FieldKind::Image,
        _ => FieldKind::Line,
    };

    let mut field = Field::new(name, title, kind);
    if let Some(category) = attr_value(start, "category")? {
        field = field.with_category(category);
    }
    if let Some(allowed) = attr_value(start, "allowed")? {
        field = field.with_allowed(allowed.split(';').map(str::trim).filter(|v| !v.is_empty()));
    }
    if attr_value(start, "multiple")?.as_deref() == Some("true") {
        field = field.with_multiple();
    }
    Ok(field)
}

fn attr_value(start: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| FetchError::payload(e.to_string()))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(payload_err)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    Ok(String::from_utf8_lossy(start.name().as_ref()).into_owned())
}

fn payload_err(err: quick_xml::Error) -> FetchError {
    FetchError::Payload(err.to_string())
}

//! Entry, field, and collection schema types
//!
//! A [`Collection`] is a typed schema of [`Field`] definitions; an
//! [`Entry`] is a bag of named string fields conforming to one. Fetchers
//! add source-specific fields to a collection before populating entries;
//! additions are idempotent (checked by name) and controlled-vocabulary
//! lists are extended, never replaced, when a new normalized value is
//! discovered.

use crate::request::CollectionKind;
use std::collections::BTreeMap;

/// Delimiter between multiple values in one field
pub const VALUE_DELIMITER: &str = "; ";
/// Delimiter between columns of one table row
pub const COLUMN_DELIMITER: &str = "::";
/// Delimiter between table rows
pub const ROW_DELIMITER: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single line of text
    Line,
    /// Paragraph of text
    Para,
    Number,
    Url,
    /// Multi-column rows, columns joined with [`COLUMN_DELIMITER`]
    Table,
    /// Value restricted to the field's allowed list
    Choice,
    Date,
    /// Opaque image identifier from the image store
    Image,
}

/// A field definition within a collection schema
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    title: String,
    category: String,
    kind: FieldKind,
    allowed: Vec<String>,
    multiple: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, title: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            category: String::from("General"),
            kind,
            allowed: Vec::new(),
            multiple: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = allowed.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn allows_multiple(&self) -> bool {
        self.multiple
    }

    /// Append a value to the allowed list if not already present.
    pub fn allow_value(&mut self, value: &str) -> bool {
        if self.allowed.iter().any(|v| v == value) {
            return false;
        }
        self.allowed.push(value.to_string());
        true
    }
}

/// A typed schema of field definitions
#[derive(Debug, Clone)]
pub struct Collection {
    kind: CollectionKind,
    fields: Vec<Field>,
}

impl Collection {
    /// Create a collection with the default field set for its kind.
    pub fn new(kind: CollectionKind) -> Self {
        let mut coll = Self {
            kind,
            fields: Vec::new(),
        };
        coll.add_default_fields();
        coll
    }

    /// Create an empty collection with no default fields.
    pub fn bare(kind: CollectionKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Add a field if no field with the same name exists.
    ///
    /// Returns true if the field was added.
    pub fn add_field(&mut self, field: Field) -> bool {
        if self.has_field(field.name()) {
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Extend a field's allowed-value list with a newly discovered value.
    ///
    /// Returns true if the value was appended.
    pub fn allow_value(&mut self, field_name: &str, value: &str) -> bool {
        match self.field_mut(field_name) {
            Some(field) => field.allow_value(value),
            None => false,
        }
    }

    fn add_default_fields(&mut self) {
        self.add_field(Field::new("title", "Title", FieldKind::Line));
        self.add_field(Field::new("year", "Year", FieldKind::Number));
        self.add_field(Field::new("genre", "Genre", FieldKind::Line).with_multiple());
        self.add_field(Field::new("cover", "Cover", FieldKind::Image));

        match self.kind {
            CollectionKind::Game => {
                self.add_field(
                    Field::new("platform", "Platform", FieldKind::Choice).with_allowed([
                        "Linux",
                        "Mac OS",
                        "Windows",
                        "Nintendo",
                        "Nintendo 64",
                        "Nintendo Wii",
                        "GameCube",
                        "Dreamcast",
                        "PlayStation",
                        "PlayStation2",
                        "PlayStation3",
                        "PlayStation4",
                        "PSP",
                        "Xbox",
                        "Xbox 360",
                        "Xbox One",
                    ]),
                );
                self.add_field(
                    Field::new("certification", "ESRB Rating", FieldKind::Choice).with_allowed(
                        crate::normalize::vocab::ESRB_RATINGS.iter().copied(),
                    ),
                );
                self.add_field(Field::new("publisher", "Publisher", FieldKind::Line).with_multiple());
                self.add_field(Field::new("developer", "Developer", FieldKind::Line).with_multiple());
                self.add_field(Field::new("description", "Description", FieldKind::Para));
            }
            CollectionKind::Video => {
                self.add_field(
                    Field::new("director", "Director", FieldKind::Line)
                        .with_category("People")
                        .with_multiple(),
                );
                self.add_field(
                    Field::new("producer", "Producer", FieldKind::Line)
                        .with_category("People")
                        .with_multiple(),
                );
                self.add_field(
                    Field::new("writer", "Writer", FieldKind::Line)
                        .with_category("People")
                        .with_multiple(),
                );
                self.add_field(
                    Field::new("composer", "Composer", FieldKind::Line)
                        .with_category("People")
                        .with_multiple(),
                );
                self.add_field(Field::new("cast", "Cast", FieldKind::Table).with_category("People"));
                self.add_field(Field::new("language", "Language", FieldKind::Line));
                self.add_field(Field::new("plot", "Plot Summary", FieldKind::Para));
            }
            CollectionKind::Music => {
                self.add_field(Field::new("artist", "Artist", FieldKind::Line).with_multiple());
                self.add_field(Field::new("label", "Label", FieldKind::Line).with_multiple());
                self.add_field(Field::new("track", "Tracks", FieldKind::Table));
                self.add_field(Field::new("medium", "Medium", FieldKind::Choice).with_allowed([
                    "Compact Disc",
                    "Cassette",
                    "Vinyl",
                    "Digital",
                ]));
            }
            CollectionKind::BoardGame => {
                self.add_field(Field::new("designer", "Designer", FieldKind::Line).with_multiple());
                self.add_field(Field::new("publisher", "Publisher", FieldKind::Line).with_multiple());
                self.add_field(Field::new("num-player", "Number of Players", FieldKind::Number));
                self.add_field(Field::new("playing-time", "Playing Time", FieldKind::Number));
                self.add_field(Field::new("description", "Description", FieldKind::Para));
            }
            CollectionKind::Book | CollectionKind::Comic => {
                self.add_field(
                    Field::new("author", "Author", FieldKind::Line)
                        .with_category("People")
                        .with_multiple(),
                );
                self.add_field(Field::new("publisher", "Publisher", FieldKind::Line));
                self.add_field(Field::new("isbn", "ISBN#", FieldKind::Line));
                self.add_field(Field::new("pub_year", "Publication Year", FieldKind::Number));
            }
        }
    }
}

/// A bag of named string fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    values: BTreeMap<String, String>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value; an empty value removes the field.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&name);
        } else {
            self.values.insert(name, value);
        }
    }

    /// Field value, or empty string when unset.
    pub fn field(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn title(&self) -> &str {
        self.field("title")
    }
}

/// Join non-empty values with the standard multi-value delimiter.
pub fn join_values<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter(|v| !v.as_ref().is_empty())
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(VALUE_DELIMITER)
}

/// Split a multi-valued field back into its parts.
pub fn split_values(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split(VALUE_DELIMITER)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_field_is_idempotent() {
        let mut coll = Collection::new(CollectionKind::Video);
        assert!(coll.add_field(Field::new("network", "Network", FieldKind::Line)));
        assert!(!coll.add_field(Field::new("network", "Other Title", FieldKind::Para)));

        // first definition wins
        assert_eq!(coll.field("network").unwrap().title(), "Network");
    }

    #[test]
    fn test_allowed_values_are_extended_not_replaced() {
        let mut coll = Collection::new(CollectionKind::Game);
        let before = coll.field("platform").unwrap().allowed().len();

        assert!(coll.allow_value("platform", "Neo Geo CD"));
        assert!(!coll.allow_value("platform", "Neo Geo CD"));

        let allowed = coll.field("platform").unwrap().allowed();
        assert_eq!(allowed.len(), before + 1);
        assert!(allowed.iter().any(|v| v == "Windows"));
        assert!(allowed.iter().any(|v| v == "Neo Geo CD"));
    }

    #[test]
    fn test_game_collection_carries_esrb_vocabulary() {
        let coll = Collection::new(CollectionKind::Game);
        let cert = coll.field("certification").unwrap();
        assert_eq!(cert.allowed().len(), 8);
        assert!(cert.allowed().iter().any(|v| v == "Teen"));
        assert!(cert.allowed().iter().any(|v| v == "Everyone 10+"));
    }

    #[test]
    fn test_empty_value_clears_field() {
        let mut entry = Entry::new();
        entry.set_field("title", "Firefly");
        assert!(entry.has_field("title"));

        entry.set_field("title", "");
        assert!(!entry.has_field("title"));
        assert_eq!(entry.field("title"), "");
    }

    #[test]
    fn test_join_and_split_values() {
        let joined = join_values(["Drama", "", "Science-Fiction"]);
        assert_eq!(joined, "Drama; Science-Fiction");
        assert_eq!(split_values(&joined), vec!["Drama", "Science-Fiction"]);
        assert!(split_values("").is_empty());
    }
}

//! Search request value objects
//!
//! A [`FetchRequest`] is constructed by the caller and never mutated by a
//! fetcher. The request router consults [`Fetcher::can_search`] and
//! [`Fetcher::can_fetch`] before building one, so a fetcher is never handed
//! a key or collection type it rejects.
//!
//! [`Fetcher::can_search`]: crate::fetcher::Fetcher::can_search
//! [`Fetcher::can_fetch`]: crate::fetcher::Fetcher::can_fetch

use serde::{Deserialize, Serialize};
use std::fmt;

/// Search key supported by one or more data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchKey {
    Title,
    Person,
    Keyword,
    Isbn,
    Upc,
    Doi,
    /// Source-specific raw query, passed through unmodified
    Raw,
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchKey::Title => "Title",
            FetchKey::Person => "Person",
            FetchKey::Keyword => "Keyword",
            FetchKey::Isbn => "ISBN",
            FetchKey::Upc => "UPC",
            FetchKey::Doi => "DOI",
            FetchKey::Raw => "Raw",
        };
        f.write_str(name)
    }
}

/// Collection type a search targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Book,
    Video,
    Music,
    Game,
    BoardGame,
    Comic,
}

impl CollectionKind {
    /// Parse the lowercase name used in canonical XML and configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "book" => Some(Self::Book),
            "video" => Some(Self::Video),
            "music" => Some(Self::Music),
            "game" => Some(Self::Game),
            "boardgame" => Some(Self::BoardGame),
            "comic" => Some(Self::Comic),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Book => "book",
            CollectionKind::Video => "video",
            CollectionKind::Music => "music",
            CollectionKind::Game => "game",
            CollectionKind::BoardGame => "boardgame",
            CollectionKind::Comic => "comic",
        };
        f.write_str(name)
    }
}

/// Immutable search request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    key: FetchKey,
    value: String,
    collection: CollectionKind,
    data: Option<String>,
}

impl FetchRequest {
    pub fn new(collection: CollectionKind, key: FetchKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            collection,
            data: None,
        }
    }

    /// Attach a source-specific filter (e.g. a platform id).
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn key(&self) -> FetchKey {
        self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn collection(&self) -> CollectionKind {
        self.collection
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

//! Reference-data cache
//!
//! Game sources expose their genre, platform, and publisher vocabularies as
//! id/name lists that rarely change. Each (source, kind) pair gets one JSON
//! file on disk; a fetcher loads it at setup, resolves ids against it during
//! normalization, and merges freshly downloaded batches back before
//! persisting the whole map.

use crate::error::{FetchError, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Incoming payload shapes: a list of id/name records, a map keying id to
/// record, or a plain id-to-name map.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<IdName>),
    Keyed(BTreeMap<String, NamedRecord>),
    Map(BTreeMap<String, String>),
}

#[derive(Deserialize)]
struct NamedRecord {
    name: String,
}

#[derive(Deserialize)]
struct IdName {
    id: IdValue,
    name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(u64),
    Text(String),
}

impl IdValue {
    fn into_key(self) -> String {
        match self {
            IdValue::Number(n) => n.to_string(),
            IdValue::Text(s) => s,
        }
    }
}

/// One source's id-to-name table for one reference kind
pub struct ReferenceCache {
    path: PathBuf,
    map: BTreeMap<String, String>,
}

impl ReferenceCache {
    /// Open the cache file for a (source, kind) pair, loading any persisted
    /// table. A missing file yields an empty cache; a corrupt file is
    /// discarded with a warning rather than failing the fetcher.
    pub fn open(dir: &Path, source: &str, kind: &str) -> Self {
        let path = dir.join(format!("{source}_{kind}.json"));
        let map = match fs::read_to_string(&path) {
            Ok(content) => match parse_payload(&content) {
                Ok(entries) => entries.into_iter().collect(),
                Err(err) => {
                    warn!("discarding corrupt reference cache {}: {err}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        debug!(
            "reference cache {} loaded with {} entries",
            path.display(),
            map.len()
        );
        Self { path, map }
    }

    /// Default cache directory under the platform cache root.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("curio/refcache")
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }

    pub fn get_numeric(&self, id: u64) -> Option<&str> {
        self.get(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Merge a batch of id/name pairs, returning how many were new or
    /// changed.
    pub fn merge<I, K, V>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut changed = 0;
        for (id, name) in batch {
            let id = id.into();
            let name = name.into();
            if self.map.get(&id) != Some(&name) {
                self.map.insert(id, name);
                changed += 1;
            }
        }
        changed
    }

    /// Merge a raw JSON payload downloaded from the source.
    pub fn merge_payload(&mut self, json: &str) -> Result<usize> {
        let entries = parse_payload(json)?;
        Ok(self.merge(entries))
    }

    /// Overwrite the on-disk file with the current table.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FetchError::cache(format!("create {}: {e}", parent.display())))?;
        }

        let json = serde_json::to_string_pretty(&self.map)
            .map_err(|e| FetchError::cache(format!("serialize reference cache: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| FetchError::cache(format!("write {}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// Parse a reference payload in either accepted shape.
pub fn parse_payload(json: &str) -> Result<Vec<(String, String)>> {
    let payload: Payload = serde_json::from_str(json)
        .map_err(|e| FetchError::cache(format!("unrecognized reference payload: {e}")))?;

    let entries = match payload {
        Payload::List(records) => records
            .into_iter()
            .map(|r| (r.id.into_key(), r.name))
            .collect(),
        Payload::Keyed(map) => map
            .into_iter()
            .map(|(id, record)| (id, record.name))
            .collect(),
        Payload::Map(map) => map.into_iter().collect(),
    };
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_list_payload() {
        let json = r#"[{"id": 5, "name": "Shooter"}, {"id": 8, "name": "Platform"}]"#;
        let entries = parse_payload(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&("5".to_string(), "Shooter".to_string())));
    }

    #[test]
    fn test_parse_map_payload() {
        let json = r#"{"18": "NES", "22": "Game Boy"}"#;
        let entries = parse_payload(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&("18".to_string(), "NES".to_string())));
    }

    #[test]
    fn test_parse_keyed_record_payload() {
        let json = r#"{"1": {"id": 1, "name": "Action"}, "8": {"id": 8, "name": "Platform"}}"#;
        let entries = parse_payload(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&("1".to_string(), "Action".to_string())));
        assert!(entries.contains(&("8".to_string(), "Platform".to_string())));
    }

    #[test]
    fn test_missing_file_yields_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ReferenceCache::open(dir.path(), "igdb", "platform");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_merge_then_persist_then_reload() {
        let dir = TempDir::new().unwrap();

        let mut cache = ReferenceCache::open(dir.path(), "igdb", "genre");
        let changed = cache.merge([("5", "Shooter"), ("8", "Platform")]);
        assert_eq!(changed, 2);
        cache.persist().unwrap();

        let reloaded = ReferenceCache::open(dir.path(), "igdb", "genre");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("5"), Some("Shooter"));
        assert_eq!(reloaded.get_numeric(8), Some("Platform"));
    }

    #[test]
    fn test_merge_counts_only_changes() {
        let dir = TempDir::new().unwrap();
        let mut cache = ReferenceCache::open(dir.path(), "tgdb", "genre");

        assert_eq!(cache.merge([("1", "Action")]), 1);
        assert_eq!(cache.merge([("1", "Action")]), 0);
        assert_eq!(cache.merge([("1", "Action-Adventure")]), 1);
        assert_eq!(cache.get("1"), Some("Action-Adventure"));
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("moby_platform.json"), "{{ not json").unwrap();

        let cache = ReferenceCache::open(dir.path(), "moby", "platform");
        assert!(cache.is_empty());
    }
}

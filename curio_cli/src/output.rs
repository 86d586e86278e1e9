//! Result and entry rendering

use clap::ValueEnum;
use colored::Colorize;
use curio_fetch_core::entry::Entry;
use curio_fetch_core::event::FetchResult;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One search hit as a single line.
pub fn format_result(result: &FetchResult, use_color: bool) -> String {
    let source = format!("[{}]", result.source);
    let source = if use_color {
        source.cyan().to_string()
    } else {
        source
    };

    let title = if use_color {
        result.title.bold().to_string()
    } else {
        result.title.clone()
    };

    if result.description.is_empty() {
        format!("{:>3}. {source} {title}", result.uid)
    } else {
        format!("{:>3}. {source} {title} ({})", result.uid, result.description)
    }
}

pub fn result_to_json(result: &FetchResult) -> Value {
    json!({
        "uid": result.uid,
        "source": result.source,
        "title": result.title,
        "description": result.description,
    })
}

/// A hydrated entry as an aligned field block, title first.
pub fn format_entry(entry: &Entry, use_color: bool) -> String {
    let mut fields: Vec<(&str, &str)> = entry.fields().collect();
    fields.sort_by_key(|(name, _)| (*name != "title", *name));

    let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut output = String::new();
    for (name, value) in fields {
        let label = format!("{name:>width$}");
        let label = if use_color {
            label.green().to_string()
        } else {
            label
        };
        output.push_str(&format!("{label}  {value}\n"));
    }
    output
}

pub fn entry_to_json(entry: &Entry) -> Value {
    let mut map = Map::new();
    for (name, value) in entry.fields() {
        map.insert(name.to_string(), Value::String(value.to_string()));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> FetchResult {
        FetchResult {
            uid: 1,
            source: "TVmaze".to_string(),
            title: "Firefly".to_string(),
            description: "2002".to_string(),
        }
    }

    #[test]
    fn test_format_result_plain() {
        let line = format_result(&sample_result(), false);
        assert_eq!(line, "  1. [TVmaze] Firefly (2002)");
    }

    #[test]
    fn test_format_entry_puts_title_first() {
        let mut entry = Entry::new();
        entry.set_field("year", "2002");
        entry.set_field("title", "Firefly");

        let block = format_entry(&entry, false);
        let first = block.lines().next().unwrap();
        assert!(first.contains("Firefly"));
    }

    #[test]
    fn test_entry_to_json() {
        let mut entry = Entry::new();
        entry.set_field("title", "Firefly");
        entry.set_field("genre", "Drama; Adventure");

        let value = entry_to_json(&entry);
        assert_eq!(value["title"], "Firefly");
        assert_eq!(value["genre"], "Drama; Adventure");
    }
}

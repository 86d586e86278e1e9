//! Status line and record parsing for the catalog protocol

use crate::entry::VALUE_DELIMITER;
use crate::error::{FetchError, Result};
use std::collections::BTreeMap;

/// One record as a tag-to-value map; repeated tags are joined with the
/// multi-value delimiter.
pub type Record = BTreeMap<String, String>;

/// Parsed three-digit reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub text: String,
}

impl StatusLine {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_auth_failure(&self) -> bool {
        self.code == 530
    }
}

/// Parse a `NNN text` reply line.
pub fn parse_status(line: &str) -> Result<StatusLine> {
    let line = line.trim_end();
    let (code_part, text) = match line.split_once(' ') {
        Some((code, text)) => (code, text),
        None => (line, ""),
    };

    if code_part.len() != 3 {
        return Err(FetchError::payload(format!(
            "malformed status line {line:?}"
        )));
    }
    let code: u16 = code_part
        .parse()
        .map_err(|_| FetchError::payload(format!("malformed status line {line:?}")))?;

    Ok(StatusLine {
        code,
        text: text.to_string(),
    })
}

/// Parse a block of `TAG value` lines into records.
///
/// Records are separated by blank lines; the terminating `.` line is not
/// part of the input. Lines without a value are skipped.
pub fn parse_records(lines: &[String]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current = Record::new();

    for line in lines {
        let line = line.trim_end();
        if line.is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }

        let Some((tag, value)) = line.split_once(' ') else {
            continue;
        };
        let tag = tag.to_uppercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match current.get_mut(&tag) {
            Some(existing) => {
                existing.push_str(VALUE_DELIMITER);
                existing.push_str(value);
            }
            None => {
                current.insert(tag, value.to_string());
            }
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        let status = parse_status("230 welcome reader").unwrap();
        assert_eq!(status.code, 230);
        assert_eq!(status.text, "welcome reader");
        assert!(status.is_ok());

        let denied = parse_status("530 invalid credentials").unwrap();
        assert!(denied.is_auth_failure());
        assert!(!denied.is_ok());
    }

    #[test]
    fn test_parse_status_without_text() {
        let status = parse_status("210").unwrap();
        assert_eq!(status.code, 210);
        assert_eq!(status.text, "");
    }

    #[test]
    fn test_parse_status_rejects_garbage() {
        assert!(parse_status("hello there").is_err());
        assert!(parse_status("3 ok").is_err());
    }

    #[test]
    fn test_parse_records() {
        let lines: Vec<String> = [
            "TI Firefly",
            "AU Whedon, Joss",
            "SU Science fiction",
            "SU Space westerns",
            "",
            "TI Serenity",
            "YR 2005",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let records = parse_records(&lines);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["TI"], "Firefly");
        assert_eq!(records[0]["SU"], "Science fiction; Space westerns");
        assert_eq!(records[1]["YR"], "2005");
    }

    #[test]
    fn test_blank_lines_and_bare_tags_are_skipped() {
        let lines: Vec<String> = ["", "TI", "", "TI Dune", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let records = parse_records(&lines);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["TI"], "Dune");
    }
}

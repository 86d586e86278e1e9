//! Static API key credential

use super::SecureString;
use crate::error::{FetchError, Result};

/// API key attached to requests as a query parameter or header.
///
/// Some sources require a user-supplied key and refuse to search without
/// one; others ship a shared default that a personal key may replace.
#[derive(Debug, Clone)]
pub struct ApiKey {
    source: String,
    key: SecureString,
}

impl ApiKey {
    pub fn new(source: impl Into<String>, key: impl Into<SecureString>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
        }
    }

    /// Build from an optional configured key, failing when the source
    /// requires one and none is set.
    pub fn required(source: impl Into<String>, configured: Option<&str>) -> Result<Self> {
        let source = source.into();
        match configured {
            Some(key) if !key.is_empty() => Ok(Self::new(source, key)),
            _ => Err(FetchError::config(format!(
                "{source} requires an API key; none is configured"
            ))),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Key value for use in a URL query pair or header.
    pub fn expose(&self) -> String {
        self.key.expose_secret()
    }
}

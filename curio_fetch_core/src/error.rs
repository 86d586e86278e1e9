//! Error types for the metadata-fetch subsystem
//!
//! Errors are categorized by the failure taxonomy every fetcher shares:
//! transport, payload, authorization, rate-limit rejection, contract misuse,
//! configuration, and cache I/O. All errors stay local to one fetcher
//! instance; the request router never lets one source's failure affect
//! another's.

use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, FetchError>;

/// Main error type for the metadata-fetch subsystem
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network or job-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Malformed or empty response payload
    #[error("malformed or empty payload: {0}")]
    Payload(String),

    /// Authorization failure (401-equivalent)
    #[error("authorization failed: {0}")]
    Auth(String),

    /// Remote service rejected the request for exceeding its rate limit
    #[error("rate limit rejected by remote service: {0}")]
    RateLimited(String),

    /// Fetcher contract misuse (wrong state, unsupported key)
    #[error("invalid fetcher state: {0}")]
    InvalidState(&'static str),

    /// No result with the given uid was emitted in this search session
    #[error("unknown result uid {0}")]
    UnknownUid(u64),

    /// Configuration load or save failure
    #[error("configuration error: {0}")]
    Config(String),

    /// Reference-data cache load or save failure
    #[error("reference cache error: {0}")]
    Cache(String),
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Classify an HTTP status into the error taxonomy.
    ///
    /// Returns `None` for success statuses.
    pub fn from_status(status: u16, context: &str) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(Self::Auth(format!("HTTP {status} from {context}"))),
            429 => Some(Self::RateLimited(format!("HTTP 429 from {context}"))),
            _ => Some(Self::Transport(format!("HTTP {status} from {context}"))),
        }
    }

    /// Whether the failure should trigger one re-authentication attempt
    /// followed by a single retry of the same request.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<std::io::Error> for FetchError {
    fn from(source: std::io::Error) -> Self {
        Self::Transport(source.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(source: reqwest::Error) -> Self {
        Self::Transport(source.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(source: serde_json::Error) -> Self {
        Self::Payload(source.to_string())
    }
}

impl From<quick_xml::Error> for FetchError {
    fn from(source: quick_xml::Error) -> Self {
        Self::Payload(source.to_string())
    }
}

impl From<figment::Error> for FetchError {
    fn from(source: figment::Error) -> Self {
        Self::Config(source.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(source: url::ParseError) -> Self {
        Self::Transport(source.to_string())
    }
}

//! Fetch event channel
//!
//! Results, user-facing messages, and the completion signal all travel on a
//! single unbounded channel per consumer. The request router owns the
//! receiving half; every fetcher holds a clone of the sender.

use tokio::sync::mpsc;

/// Severity of a user-facing message from a fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Lightweight, immediately-displayable search result.
///
/// The uid is scoped to one search session of the producing fetcher; pass it
/// back to that fetcher's `fetch_entry` to hydrate the full entry.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub uid: u64,
    /// Name of the fetcher that produced this result
    pub source: String,
    pub title: String,
    /// One-line descriptive subtitle (typically year or creator)
    pub description: String,
}

/// Event emitted by a fetcher during a search
#[derive(Debug, Clone)]
pub enum FetchEvent {
    ResultFound(FetchResult),
    Message {
        source: String,
        severity: Severity,
        text: String,
    },
    /// Completion signal, emitted exactly once per search
    Done { source: String },
}

pub type EventSender = mpsc::UnboundedSender<FetchEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<FetchEvent>;

/// Create the event channel shared by a router and its fetchers.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

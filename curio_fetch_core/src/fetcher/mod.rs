//! Fetcher contract and shared search-session state
//!
//! Every data source implements [`Fetcher`]. A search runs in two phases:
//! the search phase emits lightweight [`FetchResult`]s on the event channel
//! and parks the backing data in a hydration slot, and `fetch_entry` later
//! hydrates a slot into a full [`Entry`] on demand, issuing secondary
//! requests when the source needs them.
//!
//! [`SearchState`] centralizes the per-session bookkeeping all fetchers
//! share: the phase machine, result uid allocation, pagination counters,
//! and the generation counter that keeps output from a cancelled search
//! from leaking into the next one.

mod arcadehistory;
mod boardgamegeek;
mod igdb;
mod mobygames;
mod musicbrainz;
mod opac;
mod thegamesdb;
mod tvmaze;

pub use arcadehistory::ArcadeHistoryFetcher;
pub use boardgamegeek::BoardGameGeekFetcher;
pub use igdb::IgdbFetcher;
pub use mobygames::MobyGamesFetcher;
pub use musicbrainz::MusicBrainzFetcher;
pub use opac::OpacFetcher;
pub use thegamesdb::TheGamesDbFetcher;
pub use tvmaze::TvmazeFetcher;

use crate::entry::Entry;
use crate::error::{FetchError, Result};
use crate::event::{EventSender, FetchEvent, FetchResult, Severity};
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A metadata source
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Display name of the source
    fn source(&self) -> &str;

    fn can_search(&self, key: FetchKey) -> bool;

    fn can_fetch(&self, kind: CollectionKind) -> bool;

    /// Start a new search session.
    ///
    /// Results arrive on the event channel; the call returns once the first
    /// page has been emitted and the completion signal sent.
    async fn search(&self, request: FetchRequest) -> Result<()>;

    /// Fetch the next page of the previous search.
    async fn continue_search(&self) -> Result<()>;

    /// Whether a search is currently in flight.
    fn is_searching(&self) -> bool;

    /// Whether the previous search left more pages on the server.
    fn has_more_results(&self) -> bool;

    /// Hydrate a previously emitted result into a full entry.
    async fn fetch_entry(&self, uid: u64) -> Result<Entry>;

    /// Cancel the in-flight search, if any. Idempotent.
    fn stop(&self);
}

/// Phase of a fetcher's search session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    /// Fetching a further page of an earlier search
    Continuing,
    Done,
    Error,
}

impl Phase {
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Searching | Phase::Continuing)
    }
}

/// Hydration state of one emitted result
#[derive(Debug, Clone)]
pub enum HydrationSlot {
    /// Search-phase data plus the remote id needed to finish the job
    Partial { entry: Entry, remote_id: String },
    /// Fully hydrated; returned as-is on repeat requests
    Hydrated(Entry),
}

struct SessionInner {
    phase: Phase,
    generation: u64,
    next_uid: u64,
    offset: u64,
    total: Option<u64>,
    has_more: bool,
    slots: HashMap<u64, HydrationSlot>,
}

/// Shared per-session bookkeeping for fetcher implementations
pub struct SearchState {
    source: String,
    sender: EventSender,
    inner: Mutex<SessionInner>,
}

impl SearchState {
    pub fn new(source: impl Into<String>, sender: EventSender) -> Self {
        Self {
            source: source.into(),
            sender,
            inner: Mutex::new(SessionInner {
                phase: Phase::Idle,
                generation: 0,
                next_uid: 0,
                offset: 0,
                total: None,
                has_more: false,
                slots: HashMap::new(),
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().expect("session lock").phase
    }

    pub fn is_searching(&self) -> bool {
        self.phase().is_active()
    }

    /// Begin a new search session, discarding any previous results.
    ///
    /// Valid from any phase except an active search.
    pub fn begin_search(&self) -> Result<u64> {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.phase.is_active() {
            return Err(FetchError::InvalidState("search already in progress"));
        }
        inner.generation += 1;
        inner.phase = Phase::Searching;
        inner.next_uid = 0;
        inner.offset = 0;
        inner.total = None;
        inner.has_more = false;
        inner.slots.clear();
        Ok(inner.generation)
    }

    /// Begin fetching the next page of a completed search.
    ///
    /// Earlier results stay valid; uids keep counting up.
    pub fn begin_continue(&self) -> Result<u64> {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.phase != Phase::Done {
            return Err(FetchError::InvalidState(
                "continue_search requires a completed search",
            ));
        }
        if !inner.has_more {
            return Err(FetchError::InvalidState("no more results to continue into"));
        }
        inner.generation += 1;
        inner.phase = Phase::Continuing;
        Ok(inner.generation)
    }

    /// Emit one result, parking its hydration slot.
    ///
    /// Returns the allocated uid, or `None` when the session was cancelled
    /// or superseded since `generation` was issued.
    pub fn emit_result(
        &self,
        generation: u64,
        slot: HydrationSlot,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<u64> {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.generation != generation || !inner.phase.is_active() {
            return None;
        }

        inner.next_uid += 1;
        let uid = inner.next_uid;
        inner.slots.insert(uid, slot);

        let _ = self.sender.send(FetchEvent::ResultFound(FetchResult {
            uid,
            source: self.source.clone(),
            title: title.into(),
            description: description.into(),
        }));
        Some(uid)
    }

    /// Send a user-facing message.
    pub fn message(&self, severity: Severity, text: impl Into<String>) {
        let _ = self.sender.send(FetchEvent::Message {
            source: self.source.clone(),
            severity,
            text: text.into(),
        });
    }

    /// Record pagination counters after parsing a page.
    pub fn record_page(&self, generation: u64, page_size: u64, total: Option<u64>) {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.generation != generation {
            return;
        }
        inner.offset += page_size;
        if total.is_some() {
            inner.total = total;
        }
    }

    pub fn offset(&self) -> u64 {
        self.inner.lock().expect("session lock").offset
    }

    pub fn total(&self) -> Option<u64> {
        self.inner.lock().expect("session lock").total
    }

    /// Complete the active page normally, signalling Done exactly once.
    pub fn finish_page(&self, generation: u64, has_more: bool) {
        let mut inner = self.inner.lock().expect("session lock");
        if inner.generation != generation || !inner.phase.is_active() {
            return;
        }
        inner.phase = Phase::Done;
        inner.has_more = has_more;
        drop(inner);
        let _ = self.sender.send(FetchEvent::Done {
            source: self.source.clone(),
        });
    }

    /// Complete the active page with an error message, then signal Done.
    pub fn finish_error(&self, generation: u64, error: &FetchError) {
        {
            let mut inner = self.inner.lock().expect("session lock");
            if inner.generation != generation || !inner.phase.is_active() {
                return;
            }
            inner.phase = Phase::Error;
            inner.has_more = false;
        }
        self.message(Severity::Error, error.to_string());
        let _ = self.sender.send(FetchEvent::Done {
            source: self.source.clone(),
        });
    }

    /// Cancel the active search. Later output carrying a stale generation
    /// is dropped. Signals Done only when a search was actually active.
    pub fn stop(&self) {
        let was_active = {
            let mut inner = self.inner.lock().expect("session lock");
            inner.generation += 1;
            let was_active = inner.phase.is_active();
            if was_active {
                inner.phase = Phase::Done;
                inner.has_more = false;
            }
            was_active
        };

        if was_active {
            let _ = self.sender.send(FetchEvent::Done {
                source: self.source.clone(),
            });
        }
    }

    pub fn has_more_results(&self) -> bool {
        let inner = self.inner.lock().expect("session lock");
        inner.phase == Phase::Done && inner.has_more
    }

    /// Snapshot the slot for a uid.
    pub fn slot(&self, uid: u64) -> Result<HydrationSlot> {
        let inner = self.inner.lock().expect("session lock");
        inner
            .slots
            .get(&uid)
            .cloned()
            .ok_or(FetchError::UnknownUid(uid))
    }

    /// Replace a slot with its hydrated entry so repeat fetches are free.
    pub fn store_hydrated(&self, uid: u64, entry: Entry) {
        let mut inner = self.inner.lock().expect("session lock");
        inner.slots.insert(uid, HydrationSlot::Hydrated(entry));
    }
}

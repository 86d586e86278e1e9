//! Fetcher registry and search fan-out
//!
//! The manager owns the registered fetchers and routes work to them. A
//! multi-source search goes only to fetchers that accept both the request's
//! collection type and its search key; each capable fetcher runs in its own
//! task and reports through its own event channel.

use crate::entry::Entry;
use crate::error::{FetchError, Result};
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use crate::fetcher::Fetcher;
use log::{debug, warn};
use std::sync::Arc;

#[derive(Default)]
pub struct FetchManager {
    fetchers: Vec<Arc<dyn Fetcher>>,
}

impl FetchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fetcher: Arc<dyn Fetcher>) {
        debug!("registered fetcher {}", fetcher.source());
        self.fetchers.push(fetcher);
    }

    /// All registered fetchers, in registration order.
    pub fn sources(&self) -> Vec<&str> {
        self.fetchers.iter().map(|f| f.source()).collect()
    }

    /// Look a fetcher up by its source name.
    pub fn get(&self, source: &str) -> Option<Arc<dyn Fetcher>> {
        self.fetchers
            .iter()
            .find(|f| f.source().eq_ignore_ascii_case(source))
            .cloned()
    }

    /// Fetchers that can serve a given collection type and search key.
    pub fn capable(&self, kind: CollectionKind, key: FetchKey) -> Vec<Arc<dyn Fetcher>> {
        self.fetchers
            .iter()
            .filter(|f| f.can_fetch(kind) && f.can_search(key))
            .cloned()
            .collect()
    }

    /// Fan a search out to every capable fetcher, returning how many were
    /// started. Each fetcher emits on its own event channel and signals
    /// Done independently.
    pub fn start_search(&self, request: &FetchRequest) -> usize {
        let capable = self.capable(request.collection(), request.key());
        let count = capable.len();
        for fetcher in capable {
            let request = request.clone();
            tokio::spawn(async move {
                if let Err(err) = fetcher.search(request).await {
                    warn!("{} search refused: {err}", fetcher.source());
                }
            });
        }
        count
    }

    /// Ask one source for the next page of its previous search.
    pub fn continue_search(&self, source: &str) -> Result<()> {
        let fetcher = self
            .get(source)
            .ok_or(FetchError::InvalidState("unknown source"))?;
        if !fetcher.has_more_results() {
            return Err(FetchError::InvalidState("no more results to continue into"));
        }
        tokio::spawn(async move {
            if let Err(err) = fetcher.continue_search().await {
                warn!("{} continue refused: {err}", fetcher.source());
            }
        });
        Ok(())
    }

    /// Hydrate one result from the named source.
    pub async fn fetch_entry(&self, source: &str, uid: u64) -> Result<Entry> {
        let fetcher = self
            .get(source)
            .ok_or(FetchError::InvalidState("unknown source"))?;
        fetcher.fetch_entry(uid).await
    }

    /// Cancel every in-flight search.
    pub fn stop_all(&self) {
        for fetcher in &self.fetchers {
            fetcher.stop();
        }
    }

    pub fn is_searching(&self) -> bool {
        self.fetchers.iter().any(|f| f.is_searching())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventReceiver, EventSender, FetchEvent, channel};
    use crate::fetcher::{HydrationSlot, SearchState};
    use async_trait::async_trait;

    struct StubFetcher {
        name: &'static str,
        kind: CollectionKind,
        state: SearchState,
    }

    impl StubFetcher {
        fn new(name: &'static str, kind: CollectionKind, sender: EventSender) -> Self {
            Self {
                name,
                kind,
                state: SearchState::new(name, sender),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn source(&self) -> &str {
            self.name
        }

        fn can_search(&self, key: FetchKey) -> bool {
            key == FetchKey::Title
        }

        fn can_fetch(&self, kind: CollectionKind) -> bool {
            kind == self.kind
        }

        async fn search(&self, request: FetchRequest) -> Result<()> {
            let generation = self.state.begin_search()?;
            let mut entry = Entry::new();
            entry.set_field("title", request.value());
            self.state.emit_result(
                generation,
                HydrationSlot::Hydrated(entry),
                request.value(),
                "",
            );
            self.state.finish_page(generation, false);
            Ok(())
        }

        async fn continue_search(&self) -> Result<()> {
            let generation = self.state.begin_continue()?;
            self.state.finish_page(generation, false);
            Ok(())
        }

        fn is_searching(&self) -> bool {
            self.state.is_searching()
        }

        fn has_more_results(&self) -> bool {
            self.state.has_more_results()
        }

        async fn fetch_entry(&self, uid: u64) -> Result<Entry> {
            match self.state.slot(uid)? {
                HydrationSlot::Hydrated(entry) => Ok(entry),
                HydrationSlot::Partial { entry, .. } => Ok(entry),
            }
        }

        fn stop(&self) {
            self.state.stop();
        }
    }

    fn manager_with_stubs() -> (FetchManager, EventReceiver, EventReceiver) {
        let (game_tx, game_rx) = channel();
        let (video_tx, video_rx) = channel();

        let mut manager = FetchManager::new();
        manager.register(Arc::new(StubFetcher::new(
            "games",
            CollectionKind::Game,
            game_tx,
        )));
        manager.register(Arc::new(StubFetcher::new(
            "shows",
            CollectionKind::Video,
            video_tx,
        )));
        (manager, game_rx, video_rx)
    }

    #[test]
    fn test_capability_filtering() {
        let (manager, _g, _v) = manager_with_stubs();

        let capable = manager.capable(CollectionKind::Game, FetchKey::Title);
        assert_eq!(capable.len(), 1);
        assert_eq!(capable[0].source(), "games");

        assert!(manager.capable(CollectionKind::Game, FetchKey::Isbn).is_empty());
        assert!(manager.capable(CollectionKind::Music, FetchKey::Title).is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (manager, _g, _v) = manager_with_stubs();
        assert!(manager.get("Games").is_some());
        assert!(manager.get("nope").is_none());
    }

    #[tokio::test]
    async fn test_search_reaches_only_capable_fetchers() {
        let (manager, mut game_rx, mut video_rx) = manager_with_stubs();

        let request = FetchRequest::new(CollectionKind::Game, FetchKey::Title, "joust");
        let started = manager.start_search(&request);
        assert_eq!(started, 1);

        // wait for the spawned search to complete
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), game_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, FetchEvent::ResultFound(_)));
        assert!(video_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_entry_routes_by_source() {
        let (manager, mut game_rx, _v) = manager_with_stubs();

        let request = FetchRequest::new(CollectionKind::Game, FetchKey::Title, "joust");
        manager.start_search(&request);
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), game_rx.recv()).await;

        let entry = manager.fetch_entry("games", 1).await.unwrap();
        assert_eq!(entry.field("title"), "joust");

        assert!(matches!(
            manager.fetch_entry("nope", 1).await,
            Err(FetchError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_continue_requires_more_results() {
        let (manager, mut game_rx, _v) = manager_with_stubs();

        let request = FetchRequest::new(CollectionKind::Game, FetchKey::Title, "joust");
        manager.start_search(&request);
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), game_rx.recv()).await;

        assert!(matches!(
            manager.continue_search("games"),
            Err(FetchError::InvalidState(_))
        ));
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let (manager, mut game_rx, mut video_rx) = manager_with_stubs();
        manager.stop_all();
        manager.stop_all();
        assert!(!manager.is_searching());
        assert!(game_rx.try_recv().is_err());
        assert!(video_rx.try_recv().is_err());
    }
}

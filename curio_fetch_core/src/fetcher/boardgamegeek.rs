//! BoardGameGeek fetcher for board game collections
//!
//! Two requests per search: the search endpoint returns matching item ids,
//! and the thing endpoint returns full records for all of them at once.
//! The thing reply goes through the stylesheet pipeline into canonical
//! collection XML, so every result is parked fully hydrated. The service
//! has no pagination; a search is always a single page.

use crate::entry::Entry;
use crate::error::{FetchError, Result};
use crate::event::EventSender;
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::HttpClient;
use crate::importer;
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use crate::transform::XsltPipeline;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const BGG_API: &str = "https://boardgamegeek.com/xmlapi2";
const MIN_INTERVAL: Duration = Duration::from_millis(500);

pub struct BoardGameGeekFetcher {
    http: Arc<dyn HttpClient>,
    pipeline: Arc<dyn XsltPipeline>,
    state: SearchState,
    limiter: RateLimiter,
    max_results: usize,
}

impl BoardGameGeekFetcher {
    pub const SOURCE: &'static str = "BoardGameGeek";

    pub fn new(
        http: Arc<dyn HttpClient>,
        pipeline: Arc<dyn XsltPipeline>,
        sender: EventSender,
        max_results: usize,
    ) -> Self {
        Self {
            http,
            pipeline,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            max_results,
        }
    }

    async fn api_get(&self, path: &str, pairs: &[(&str, &str)]) -> Result<String> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(&format!("{BGG_API}/{path}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("boardgamegeek.com")?;
        Ok(response.body)
    }

    async fn run_search(&self, generation: u64, request: &FetchRequest) -> Result<()> {
        let exact = if request.key() == FetchKey::Title { "1" } else { "0" };
        let listing = self
            .api_get(
                "search",
                &[
                    ("query", request.value()),
                    ("type", "boardgame"),
                    ("exact", exact),
                ],
            )
            .await?;

        let mut ids = item_ids(&listing);
        ids.truncate(self.max_results);
        if ids.is_empty() {
            self.state.finish_page(generation, false);
            return Ok(());
        }

        let things = self
            .api_get("thing", &[("id", &ids.join(",")), ("stats", "1")])
            .await?;
        let canonical = self.pipeline.transform(&things)?;
        let result = importer::import(&canonical)?;

        for entry in result.entries {
            let title = entry.field("title").to_string();
            let description = entry.field("year").to_string();
            self.state
                .emit_result(generation, HydrationSlot::Hydrated(entry), title, description);
        }
        self.state.finish_page(generation, false);
        Ok(())
    }
}

/// Collect the id attribute of every item element in a search reply.
fn item_ids(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                if start.local_name().as_ref() == b"item" {
                    for attr in start.attributes().flatten() {
                        if attr.key.as_ref() == b"id" {
                            if let Ok(value) = attr.unescape_value() {
                                ids.push(value.into_owned());
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    ids
}

#[async_trait]
impl Fetcher for BoardGameGeekFetcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn can_search(&self, key: FetchKey) -> bool {
        matches!(key, FetchKey::Title | FetchKey::Keyword)
    }

    fn can_fetch(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::BoardGame
    }

    async fn search(&self, request: FetchRequest) -> Result<()> {
        if !self.can_search(request.key()) {
            return Err(FetchError::InvalidState("unsupported search key"));
        }

        let generation = self.state.begin_search()?;
        if let Err(err) = self.run_search(generation, &request).await {
            self.state.finish_error(generation, &err);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventReceiver, FetchEvent, channel};
    use crate::transform::FnPipeline;
    use crate::curio_test_utils::MockHttpClient;
    use crate::curio_test_utils::fixtures;

    fn stylesheet() -> Arc<dyn XsltPipeline> {
        Arc::new(FnPipeline(|_: &str| {
            Ok(fixtures::BGG_CANONICAL_CATAN.to_string())
        }))
    }

    fn fetcher_with_mock() -> (Arc<MockHttpClient>, BoardGameGeekFetcher, EventReceiver) {
        let mock = Arc::new(MockHttpClient::new());
        let (tx, rx) = channel();
        let fetcher = BoardGameGeekFetcher::new(mock.clone(), stylesheet(), tx, 20);
        (mock, fetcher, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn catan_request() -> FetchRequest {
        FetchRequest::new(CollectionKind::BoardGame, FetchKey::Title, "catan")
    }

    #[tokio::test]
    async fn test_search_chains_listing_and_thing_requests() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("xmlapi2/search", 200, fixtures::BGG_SEARCH_CATAN);
        mock.respond_when("xmlapi2/thing", 200, fixtures::BGG_THING_CATAN);

        fetcher.search(catan_request()).await.unwrap();

        let events = drain(&mut rx);
        let results: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::ResultFound(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "CATAN");
        assert_eq!(results[0].description, "1995");
        assert!(matches!(events.last(), Some(FetchEvent::Done { .. })));

        let requests = mock.requests();
        assert!(requests[0].url.contains("exact=1"));
        assert!(requests[1].url.contains("thing?id=13"));
    }

    #[tokio::test]
    async fn test_hydration_is_free() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("xmlapi2/search", 200, fixtures::BGG_SEARCH_CATAN);
        mock.respond_when("xmlapi2/thing", 200, fixtures::BGG_THING_CATAN);

        fetcher.search(catan_request()).await.unwrap();
        let _ = drain(&mut rx);

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("designer"), "Klaus Teuber");
        assert_eq!(entry.field("publisher"), "KOSMOS");
        assert_eq!(entry.field("playing-time"), "120");
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_listing_finishes_without_thing_request() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("xmlapi2/search", 200, r#"<items total="0"></items>"#);

        fetcher.search(catan_request()).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FetchEvent::Done { .. }));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_single_page_refuses_continue() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("xmlapi2/search", 200, fixtures::BGG_SEARCH_CATAN);
        mock.respond_when("xmlapi2/thing", 200, fixtures::BGG_THING_CATAN);

        fetcher.search(catan_request()).await.unwrap();
        let _ = drain(&mut rx);

        assert!(!fetcher.has_more_results());
        assert!(fetcher.continue_search().await.is_err());
    }
}

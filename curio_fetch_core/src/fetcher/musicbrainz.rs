//! MusicBrainz fetcher for music collections
//!
//! Queries the public web service with a Lucene query, then runs the XML
//! reply through the configured stylesheet pipeline and imports the
//! canonical result. Everything needed for a full entry is in the search
//! reply, so results are parked fully hydrated. The release-list carries
//! count and offset attributes; pagination follows them with the service's
//! one-request-per-second gate.

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

const MUSICBRAINZ_API: &str = "https://musicbrainz.org/ws/2/release";
const MIN_INTERVAL: Duration = Duration::from_millis(1000);

pub struct MusicBrainzFetcher {
    http: Arc<dyn HttpClient>,
    pipeline: Arc<dyn XsltPipeline>,
    state: SearchState,
    limiter: RateLimiter,
    max_results: usize,
    last_query: std::sync::Mutex<String>,
}

impl MusicBrainzFetcher {
    pub const SOURCE: &'static str = "MusicBrainz";

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
            last_query: std::sync::Mutex::new(String::new()),
        }
    }

    async fn run_page(&self, generation: u64, query: &str, offset: u64) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(MUSICBRAINZ_API)?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &self.max_results.to_string())
            .append_pair("offset", &offset.to_string());

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("musicbrainz.org")?;

        let total = release_list_count(&response.body);
        let canonical = self.pipeline.transform(&response.body)?;
        let result = importer::import(&canonical)?;

        let page_size = result.entries.len() as u64;
        for entry in result.entries {
            let title = entry.field("title").to_string();
            let description = describe(&entry);
            self.state
                .emit_result(generation, HydrationSlot::Hydrated(entry), title, description);
        }

        self.state.record_page(generation, page_size, total);
        let seen = self.state.offset();
        let has_more = total.is_some_and(|t| seen < t) && page_size > 0;
        self.state.finish_page(generation, has_more);
        Ok(())
    }
}

fn describe(entry: &Entry) -> String {
    let artist = entry.field("artist");
    let year = entry.field("year");
    match (artist.is_empty(), year.is_empty()) {
        (false, false) => format!("{artist} ({year})"),
        (false, true) => artist.to_string(),
        (true, false) => year.to_string(),
        (true, true) => String::new(),
    }
}

/// Read the count attribute off the release-list element.
fn release_list_count(xml: &str) -> Option<u64> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                if start.local_name().as_ref() == b"release-list" {
                    for attr in start.attributes().flatten() {
                        if attr.key.as_ref() == b"count" {
                            return attr
                                .unescape_value()
                                .ok()
                                .and_then(|v| v.parse().ok());
                        }
                    }
                    return None;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn lucene_query(request: &FetchRequest) -> String {
    let value = request.value().replace('"', "");
    match request.key() {
        FetchKey::Person => format!("artist:\"{value}\""),
        FetchKey::Keyword => value,
        _ => format!("release:\"{value}\""),
    }
}

#[async_trait]
impl Fetcher for MusicBrainzFetcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn can_search(&self, key: FetchKey) -> bool {
        matches!(key, FetchKey::Title | FetchKey::Person | FetchKey::Keyword)
    }

    fn can_fetch(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::Music
    }

    async fn search(&self, request: FetchRequest) -> Result<()> {
        if !self.can_search(request.key()) {
            return Err(FetchError::InvalidState("unsupported search key"));
        }

        let generation = self.state.begin_search()?;
        let query = lucene_query(&request);
        *self.last_query.lock().expect("query lock") = query.clone();
        if let Err(err) = self.run_page(generation, &query, 0).await {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    async fn continue_search(&self) -> Result<()> {
        let generation = self.state.begin_continue()?;
        let offset = self.state.offset();
        let query = self.last_query.lock().expect("query lock").clone();
        if let Err(err) = self.run_page(generation, &query, offset).await {
            self.state.finish_error(generation, &err);
        }
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
        Arc::new(FnPipeline(|xml: &str| {
            if xml.contains("mbid-0003") {
                Ok(fixtures::MUSICBRAINZ_CANONICAL_PAGE2.to_string())
            } else {
                Ok(fixtures::MUSICBRAINZ_CANONICAL.to_string())
            }
        }))
    }

    fn fetcher_with_mock() -> (Arc<MockHttpClient>, MusicBrainzFetcher, EventReceiver) {
        let mock = Arc::new(MockHttpClient::new());
        let (tx, rx) = channel();
        let fetcher = MusicBrainzFetcher::new(mock.clone(), stylesheet(), tx, 2);
        (mock, fetcher, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn title_request() -> FetchRequest {
        FetchRequest::new(CollectionKind::Music, FetchKey::Title, "black parade")
    }

    #[tokio::test]
    async fn test_search_emits_transformed_releases() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("ws/2/release", 200, fixtures::MUSICBRAINZ_RELEASES);

        fetcher.search(title_request()).await.unwrap();

        let events = drain(&mut rx);
        let results: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::ResultFound(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Black Parade");
        assert_eq!(results[0].description, "My Chemical Romance (2006)");
        assert!(matches!(events.last(), Some(FetchEvent::Done { .. })));

        // the title key becomes a quoted release clause
        assert!(mock.requests()[0].url.contains("query=release%3A%22black+parade%22"));
    }

    #[tokio::test]
    async fn test_hydration_needs_no_second_request() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("ws/2/release", 200, fixtures::MUSICBRAINZ_RELEASES);

        fetcher.search(title_request()).await.unwrap();
        let _ = drain(&mut rx);

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("artist"), "My Chemical Romance");
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_pagination_follows_count_attribute() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.push_response(200, fixtures::MUSICBRAINZ_RELEASES);
        mock.push_response(200, fixtures::MUSICBRAINZ_RELEASES_PAGE2);

        fetcher.search(title_request()).await.unwrap();
        let _ = drain(&mut rx);
        assert!(fetcher.has_more_results());

        fetcher.continue_search().await.unwrap();
        let events = drain(&mut rx);
        let results: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::ResultFound(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uid, 3);
        assert_eq!(results[0].title, "Welcome to the Black Parade");
        assert!(!fetcher.has_more_results());

        assert!(mock.requests()[1].url.contains("offset=2"));
    }

    #[tokio::test]
    async fn test_person_key_searches_by_artist() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("ws/2/release", 200, fixtures::MUSICBRAINZ_RELEASES);

        let request = FetchRequest::new(
            CollectionKind::Music,
            FetchKey::Person,
            "My Chemical Romance",
        );
        fetcher.search(request).await.unwrap();
        let _ = drain(&mut rx);

        assert!(mock.requests()[0].url.contains("artist%3A%22My+Chemical+Romance%22"));
    }
}

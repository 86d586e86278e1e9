//! TVmaze fetcher for video collections
//!
//! Searches `/search/shows` and hydrates through `/shows/{id}` with the
//! cast and crew embedded. The search payload already carries most of the
//! show fields, so the partial entry is nearly complete; hydration adds the
//! people and the cover.

use crate::entry::{COLUMN_DELIMITER, Entry, ROW_DELIMITER, join_values};
use crate::error::{FetchError, Result};
use crate::event::EventSender;
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::HttpClient;
use crate::images::ImageStore;
use crate::normalize::html::clean_fragment;
use crate::normalize::map_value_path;
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const TVMAZE_API: &str = "https://api.tvmaze.com";
const MIN_INTERVAL: Duration = Duration::from_millis(250);

pub struct TvmazeFetcher {
    http: Arc<dyn HttpClient>,
    images: Arc<dyn ImageStore>,
    state: SearchState,
    limiter: RateLimiter,
    max_results: usize,
}

impl TvmazeFetcher {
    pub const SOURCE: &'static str = "TVmaze";

    pub fn new(
        http: Arc<dyn HttpClient>,
        images: Arc<dyn ImageStore>,
        sender: EventSender,
        max_results: usize,
    ) -> Self {
        Self {
            http,
            images,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            max_results,
        }
    }

    async fn run_search(&self, generation: u64, request: &FetchRequest) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(TVMAZE_API)?;
        url.set_path("/search/shows");
        url.query_pairs_mut().append_pair("q", request.value());

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("api.tvmaze.com")?;

        let doc: Value = response.json()?;
        let hits = doc
            .as_array()
            .ok_or_else(|| FetchError::payload("show search did not return a list"))?;

        for hit in hits.iter().take(self.max_results) {
            let Some(show) = hit.get("show") else {
                continue;
            };
            let remote_id = map_value_path(show, "id");
            if remote_id.is_empty() {
                continue;
            }

            let entry = entry_from_show(show);
            let title = entry.field("title").to_string();
            let description = entry.field("year").to_string();
            self.state.emit_result(
                generation,
                HydrationSlot::Partial { entry, remote_id },
                title,
                description,
            );
        }

        self.state.finish_page(generation, false);
        Ok(())
    }

    async fn hydrate(&self, remote_id: &str, mut entry: Entry) -> Result<Entry> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(TVMAZE_API)?;
        url.set_path(&format!("/shows/{remote_id}"));
        url.query_pairs_mut()
            .append_pair("embed[]", "cast")
            .append_pair("embed[]", "crew");

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("api.tvmaze.com")?;
        let doc: Value = response.json()?;

        let mut cast_rows = Vec::new();
        if let Some(cast) = doc.pointer("/_embedded/cast").and_then(Value::as_array) {
            for member in cast {
                let name = map_value_path(member, "person.name");
                if name.is_empty() {
                    continue;
                }
                let character = map_value_path(member, "character.name");
                cast_rows.push(format!("{name}{COLUMN_DELIMITER}{character}"));
            }
        }
        if !cast_rows.is_empty() {
            entry.set_field("cast", cast_rows.join(ROW_DELIMITER));
        }

        let mut directors = Vec::new();
        let mut producers = Vec::new();
        let mut writers = Vec::new();
        let mut composers = Vec::new();
        if let Some(crew) = doc.pointer("/_embedded/crew").and_then(Value::as_array) {
            for member in crew {
                let name = map_value_path(member, "person.name");
                if name.is_empty() {
                    continue;
                }
                let role = map_value_path(member, "type").to_lowercase();
                if role.contains("director") {
                    directors.push(name);
                } else if role.contains("producer") {
                    producers.push(name);
                } else if role.contains("composer") {
                    composers.push(name);
                } else if role.contains("writer") || role.contains("creator") {
                    writers.push(name);
                }
            }
        }
        entry.set_field("director", join_values(directors));
        entry.set_field("producer", join_values(producers));
        entry.set_field("writer", join_values(writers));
        entry.set_field("composer", join_values(composers));

        let mut image = map_value_path(&doc, "image.original");
        if image.is_empty() {
            image = map_value_path(&doc, "image.medium");
        }
        if let Ok(image_url) = Url::parse(&image) {
            entry.set_field("cover", self.images.store(&image_url).await);
        }

        Ok(entry)
    }
}

fn entry_from_show(show: &Value) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("title", map_value_path(show, "name"));

    // get() rather than a byte slice so a mangled date degrades quietly
    let premiered = map_value_path(show, "premiered");
    if let Some(year) = premiered.get(..4) {
        entry.set_field("year", year);
    }

    entry.set_field("genre", map_value_path(show, "genres"));
    entry.set_field("language", map_value_path(show, "language"));
    entry.set_field("network", map_value_path(show, "network.name"));

    let summary = map_value_path(show, "summary");
    if !summary.is_empty() {
        entry.set_field("plot", clean_fragment(&summary));
    }
    entry
}

#[async_trait]
impl Fetcher for TvmazeFetcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn can_search(&self, key: FetchKey) -> bool {
        matches!(key, FetchKey::Title | FetchKey::Keyword)
    }

    fn can_fetch(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::Video
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
        // single-page source; begin_continue always refuses
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
            HydrationSlot::Partial { entry, remote_id } => {
                match self.hydrate(&remote_id, entry.clone()).await {
                    Ok(full) => {
                        self.state.store_hydrated(uid, full.clone());
                        Ok(full)
                    }
                    Err(err) => {
                        self.state.message(
                            crate::event::Severity::Warning,
                            format!("could not fetch full show details: {err}"),
                        );
                        Ok(entry)
                    }
                }
            }
        }
    }

    fn stop(&self) {
        self.state.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FetchEvent, Severity, channel};
    use crate::images::NullImageStore;
    use crate::curio_test_utils::MockHttpClient;
    use crate::curio_test_utils::fixtures;

    fn fetcher_with_mock() -> (Arc<MockHttpClient>, TvmazeFetcher, crate::event::EventReceiver) {
        let mock = Arc::new(MockHttpClient::new());
        let (tx, rx) = channel();
        let fetcher = TvmazeFetcher::new(mock.clone(), Arc::new(NullImageStore), tx, 20);
        (mock, fetcher, rx)
    }

    fn drain(rx: &mut crate::event::EventReceiver) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_firefly_search_emits_one_result() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("/search/shows", 200, fixtures::TVMAZE_SEARCH_FIREFLY);

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "firefly",
            ))
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            FetchEvent::ResultFound(result) => {
                assert_eq!(result.title, "Firefly");
                assert_eq!(result.description, "2002");
                assert_eq!(result.source, "TVmaze");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events[1], FetchEvent::Done { .. }));
        assert!(!fetcher.has_more_results());
    }

    #[tokio::test]
    async fn test_hydration_fills_people_and_clears_no_id() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("/search/shows", 200, fixtures::TVMAZE_SEARCH_FIREFLY);
        mock.respond_when("/shows/180", 200, fixtures::TVMAZE_SHOW_FIREFLY);

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "firefly",
            ))
            .await
            .unwrap();
        let _ = drain(&mut rx);

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("title"), "Firefly");
        assert_eq!(entry.field("network"), "FOX");
        assert_eq!(entry.field("genre"), "Drama; Adventure; Science-Fiction");
        assert_eq!(entry.field("writer"), "Joss Whedon");
        assert_eq!(entry.field("producer"), "Tim Minear");
        assert_eq!(entry.field("composer"), "Greg Edmonson");
        assert!(entry.field("cast").starts_with("Nathan Fillion::Captain"));
        assert!(entry.field("plot").contains("Serenity"));

        // no source-id leaks into the hydrated entry
        assert!(entry.fields().all(|(name, _)| !name.contains("id")));
    }

    #[tokio::test]
    async fn test_multibyte_premiere_date_is_dropped() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        // a char straddling the year boundary must not split the string
        mock.respond_when(
            "/search/shows",
            200,
            r#"[{"show": {"id": 7, "name": "Garbled", "premiered": "199•-01-01"}}]"#,
        );

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "garbled",
            ))
            .await
            .unwrap();

        let events = drain(&mut rx);
        match &events[0] {
            FetchEvent::ResultFound(result) => {
                assert_eq!(result.title, "Garbled");
                assert_eq!(result.description, "");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_entry_is_idempotent() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("/search/shows", 200, fixtures::TVMAZE_SEARCH_FIREFLY);
        mock.respond_when("/shows/180", 200, fixtures::TVMAZE_SHOW_FIREFLY);

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "firefly",
            ))
            .await
            .unwrap();
        let _ = drain(&mut rx);

        let first = fetcher.fetch_entry(1).await.unwrap();
        let requests_after_first = mock.request_count();
        let second = fetcher.fetch_entry(1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.request_count(), requests_after_first);
    }

    #[tokio::test]
    async fn test_hydration_failure_returns_partial() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.respond_when("/search/shows", 200, fixtures::TVMAZE_SEARCH_FIREFLY);
        mock.fail_when("/shows/180", "connection reset");

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "firefly",
            ))
            .await
            .unwrap();
        let _ = drain(&mut rx);

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("title"), "Firefly");
        assert_eq!(entry.field("cast"), "");

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            FetchEvent::Message {
                severity: Severity::Warning,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_transport_failure_ends_search_with_error() {
        let (mock, fetcher, mut rx) = fetcher_with_mock();
        mock.fail_when("/search/shows", "offline");

        fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Title,
                "firefly",
            ))
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            FetchEvent::Message {
                severity: Severity::Error,
                ..
            }
        ));
        assert!(matches!(events[1], FetchEvent::Done { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_key_is_rejected() {
        let (_mock, fetcher, _rx) = fetcher_with_mock();
        let result = fetcher
            .search(FetchRequest::new(
                CollectionKind::Video,
                FetchKey::Isbn,
                "978-0",
            ))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_unknown_uid() {
        let (_mock, fetcher, _rx) = fetcher_with_mock();
        assert!(matches!(
            fetcher.fetch_entry(9).await,
            Err(FetchError::UnknownUid(9))
        ));
    }
}

//! IGDB fetcher for game collections
//!
//! Talks the Apicalypse query dialect: a POST body listing fields, a search
//! clause, and limit/offset clauses for paging. Authentication is a bearer
//! token obtained from the token endpoint and refreshed through
//! [`TokenManager`]; a refreshed token is written back to the config file
//! so it survives the session.
//!
//! Genre and platform ids come from static tables; publisher and developer
//! ids are resolved during hydration with a secondary `/companies` query.

use crate::config::{ConfigManager, IgdbConfig};
use crate::credentials::{TokenManager, TokenState};
use crate::entry::{Entry, join_values};
use crate::error::{FetchError, Result};
use crate::event::{EventSender, Severity};
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::{HttpClient, HttpResponse};
use crate::images::ImageStore;
use crate::normalize::{map_value_path, vocab};
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use log::warn;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const IGDB_API: &str = "https://api.igdb.com/v4";
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const MIN_INTERVAL: Duration = Duration::from_millis(250);

const SEARCH_FIELDS: &str = "fields name,cover.url,platforms,genres,summary,\
age_ratings.category,age_ratings.rating,first_release_date,\
involved_companies.company,involved_companies.developer,involved_companies.publisher;";

static GENRES: Lazy<HashMap<u64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (2, "Point-and-click"),
        (4, "Fighting"),
        (5, "Shooter"),
        (7, "Music"),
        (8, "Platform"),
        (9, "Puzzle"),
        (10, "Racing"),
        (11, "Real Time Strategy"),
        (12, "Role-playing"),
        (13, "Simulator"),
        (14, "Sport"),
        (15, "Strategy"),
        (16, "Turn-based strategy"),
        (24, "Tactical"),
        (25, "Hack and slash"),
        (26, "Quiz/Trivia"),
        (30, "Pinball"),
        (31, "Adventure"),
        (32, "Indie"),
        (33, "Arcade"),
    ])
});

static PLATFORMS: Lazy<HashMap<u64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (3, "Linux"),
        (4, "Nintendo 64"),
        (5, "Nintendo Wii"),
        (6, "Windows"),
        (7, "PlayStation"),
        (8, "PlayStation2"),
        (9, "PlayStation3"),
        (11, "Xbox"),
        (12, "Xbox 360"),
        (13, "DOS"),
        (14, "Mac OS"),
        (18, "Nintendo Entertainment System"),
        (19, "Super Nintendo"),
        (20, "Nintendo DS"),
        (21, "GameCube"),
        (22, "Game Boy Color"),
        (23, "Dreamcast"),
        (24, "Game Boy Advance"),
        (33, "Game Boy"),
        (38, "PSP"),
        (41, "Wii U"),
        (48, "PlayStation4"),
        (49, "Xbox One"),
        (130, "Nintendo Switch"),
        (167, "PlayStation 5"),
        (169, "Xbox Series X"),
    ])
});

pub struct IgdbFetcher {
    http: Arc<dyn HttpClient>,
    images: Arc<dyn ImageStore>,
    state: SearchState,
    limiter: RateLimiter,
    token: TokenManager,
    image_size: String,
    max_results: usize,
    persist: Option<ConfigManager>,
    last_query: std::sync::Mutex<String>,
}

impl IgdbFetcher {
    pub const SOURCE: &'static str = "IGDB";

    pub fn new(
        http: Arc<dyn HttpClient>,
        images: Arc<dyn ImageStore>,
        sender: EventSender,
        config: &IgdbConfig,
        max_results: usize,
    ) -> Result<Self> {
        let client_id = config.effective_client_id()?;
        let token_url = Url::parse(TOKEN_URL)?;
        Ok(Self {
            http,
            images,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            token: TokenManager::new(token_url, client_id),
            image_size: config.image_size.clone(),
            max_results,
            persist: None,
            last_query: std::sync::Mutex::new(String::new()),
        })
    }

    /// Persist refreshed tokens through this config manager.
    pub fn with_persistence(mut self, manager: ConfigManager) -> Self {
        self.persist = Some(manager);
        self
    }

    /// Seed the token manager from configuration.
    pub async fn restore_token(&self, config: &IgdbConfig) {
        if let (Some(token), Some(expires)) = (&config.access_token, config.token_expires) {
            if let Some(expires_at) = DateTime::from_timestamp(expires, 0) {
                self.token.restore(token.clone(), expires_at).await;
            }
        }
    }

    fn persist_token(&self, fresh: &TokenState) {
        let Some(manager) = &self.persist else {
            return;
        };
        let result = manager.load().and_then(|mut config| {
            config.igdb.access_token = Some(fresh.access_token.expose_secret());
            config.igdb.token_expires = Some(fresh.expires_at.timestamp());
            manager.save(&config)
        });
        if let Err(err) = result {
            warn!("could not persist refreshed IGDB token: {err}");
        }
    }

    async fn bearer(&self) -> Result<String> {
        let (token, refreshed) = self.token.bearer(&*self.http).await?;
        if let Some(fresh) = refreshed {
            self.persist_token(&fresh);
        }
        Ok(token)
    }

    /// POST an Apicalypse query, retrying once after a token refresh on an
    /// authorization failure.
    async fn api_post(&self, endpoint: &str, body: &str) -> Result<HttpResponse> {
        let url = Url::parse(&format!("{IGDB_API}/{endpoint}"))?;

        let mut token = self.bearer().await?;
        for attempt in 0..2 {
            let headers = vec![
                ("Client-ID".to_string(), self.token.client_id().to_string()),
                ("Authorization".to_string(), format!("Bearer {token}")),
            ];

            self.limiter.wait_if_needed().await;
            let response = self.http.post(&url, &headers, body.to_string()).await?;
            match FetchError::from_status(response.status, "api.igdb.com") {
                None => return Ok(response),
                Some(err) if err.requires_reauth() && attempt == 0 => {
                    self.token.invalidate().await;
                    token = self.bearer().await?;
                }
                Some(err) => return Err(err),
            }
        }
        unreachable!("retry loop always returns")
    }

    async fn run_page(&self, generation: u64, query: &str, offset: u64) -> Result<()> {
        let body = format!(
            "{SEARCH_FIELDS} search \"{query}\"; limit {}; offset {offset};",
            self.max_results
        );
        let response = self.api_post("games", &body).await?;

        let doc: Value = response.json()?;
        let games = doc
            .as_array()
            .ok_or_else(|| FetchError::payload("game query did not return a list"))?;

        for game in games {
            let entry = entry_from_game(game);
            let remote_id = company_spec(game, &self.image_size);
            let title = entry.field("title").to_string();
            let description = entry.field("year").to_string();
            self.state.emit_result(
                generation,
                HydrationSlot::Partial { entry, remote_id },
                title,
                description,
            );
        }

        self.state
            .record_page(generation, games.len() as u64, None);
        self.state
            .finish_page(generation, games.len() >= self.max_results);
        Ok(())
    }

    async fn hydrate(&self, remote_id: &str, mut entry: Entry) -> Result<Entry> {
        let (cover, spec) = remote_id.split_once('\n').unwrap_or((remote_id, ""));
        let (dev_part, pub_part) = spec.split_once('|').unwrap_or(("", ""));

        let mut ids: Vec<&str> = dev_part
            .split(',')
            .chain(pub_part.split(','))
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if !ids.is_empty() {
            let body = format!("fields name; where id = ({});", ids.join(","));
            let response = self.api_post("companies", &body).await?;
            let doc: Value = response.json()?;

            let mut names = HashMap::new();
            if let Some(companies) = doc.as_array() {
                for company in companies {
                    let id = map_value_path(company, "id");
                    let name = map_value_path(company, "name");
                    if !id.is_empty() && !name.is_empty() {
                        names.insert(id, name);
                    }
                }
            }

            let resolve = |part: &str| {
                join_values(
                    part.split(',')
                        .filter_map(|id| names.get(id))
                        .map(String::as_str),
                )
            };
            entry.set_field("developer", resolve(dev_part));
            entry.set_field("publisher", resolve(pub_part));
        }

        if let Ok(cover_url) = Url::parse(cover) {
            entry.set_field("cover", self.images.store(&cover_url).await);
        }
        Ok(entry)
    }
}

fn entry_from_game(game: &Value) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("title", map_value_path(game, "name"));
    entry.set_field("description", map_value_path(game, "summary"));

    if let Some(ts) = game.get("first_release_date").and_then(Value::as_i64) {
        if let Some(date) = DateTime::<Utc>::from_timestamp(ts, 0) {
            entry.set_field("year", date.year().to_string());
        }
    }

    if let Some(ids) = game.get("genres").and_then(Value::as_array) {
        let genres: Vec<&str> = ids
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|id| GENRES.get(&id).copied())
            .collect();
        entry.set_field("genre", join_values(genres));
    }

    if let Some(ids) = game.get("platforms").and_then(Value::as_array) {
        let platforms: Vec<&str> = ids
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|id| PLATFORMS.get(&id).copied())
            .collect();
        entry.set_field("platform", join_values(platforms));
    }

    if let Some(cert) = certification(game) {
        entry.set_field("certification", cert);
    }
    entry
}

/// Prefer the ESRB rating, fall back to any other mappable scheme.
fn certification(game: &Value) -> Option<String> {
    let ratings = game.get("age_ratings")?.as_array()?;
    let mapped = |record: &Value| {
        let category = record.get("category")?.as_u64()?;
        let rating = record.get("rating")?.as_u64()?;
        vocab::igdb_age_rating(category, rating)
    };

    ratings
        .iter()
        .filter(|r| r.get("category").and_then(Value::as_u64) == Some(1))
        .find_map(mapped)
        .or_else(|| ratings.iter().find_map(mapped))
}

/// Pack the hydration inputs into the slot's remote id: the cover URL on
/// the first line, then developer ids `|` publisher ids.
fn company_spec(game: &Value, image_size: &str) -> String {
    let mut devs = Vec::new();
    let mut pubs = Vec::new();
    if let Some(companies) = game.get("involved_companies").and_then(Value::as_array) {
        for involved in companies {
            let Some(company) = involved.get("company").and_then(Value::as_u64) else {
                continue;
            };
            if involved.get("developer").and_then(Value::as_bool) == Some(true) {
                devs.push(company.to_string());
            }
            if involved.get("publisher").and_then(Value::as_bool) == Some(true) {
                pubs.push(company.to_string());
            }
        }
    }

    let mut cover = map_value_path(game, "cover.url");
    if cover.starts_with("//") {
        cover = format!("https:{cover}");
    }
    // thumbnails are tiny; ask for the configured rendition instead
    cover = cover.replace("/t_thumb/", &format!("/t_{image_size}/"));

    format!("{cover}\n{}|{}", devs.join(","), pubs.join(","))
}

#[async_trait]
impl Fetcher for IgdbFetcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn can_search(&self, key: FetchKey) -> bool {
        matches!(key, FetchKey::Title | FetchKey::Keyword)
    }

    fn can_fetch(&self, kind: CollectionKind) -> bool {
        kind == CollectionKind::Game
    }

    async fn search(&self, request: FetchRequest) -> Result<()> {
        if !self.can_search(request.key()) {
            return Err(FetchError::InvalidState("unsupported search key"));
        }

        let generation = self.state.begin_search()?;
        *self.last_query.lock().expect("query lock") = request.value().to_string();
        if let Err(err) = self.run_page(generation, request.value(), 0).await {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    async fn continue_search(&self) -> Result<()> {
        let generation = self.state.begin_continue()?;
        let offset = self.state.offset();
        // reissue the original query with a moved offset clause
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
            HydrationSlot::Partial { entry, remote_id } => {
                match self.hydrate(&remote_id, entry.clone()).await {
                    Ok(full) => {
                        self.state.store_hydrated(uid, full.clone());
                        Ok(full)
                    }
                    Err(err) => {
                        self.state.message(
                            Severity::Warning,
                            format!("could not resolve companies: {err}"),
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
    use crate::event::{EventReceiver, FetchEvent, channel};
    use crate::images::NullImageStore;
    use crate::curio_test_utils::MockHttpClient;
    use crate::curio_test_utils::fixtures;
    use tempfile::TempDir;

    fn fetcher_with_mock(max_results: usize) -> (Arc<MockHttpClient>, IgdbFetcher, EventReceiver) {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_when("oauth2/token", 200, fixtures::IGDB_TOKEN);
        let (tx, rx) = channel();
        let fetcher = IgdbFetcher::new(
            mock.clone(),
            Arc::new(NullImageStore),
            tx,
            &IgdbConfig::default(),
            max_results,
        )
        .unwrap();
        (mock, fetcher, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn game_request() -> FetchRequest {
        FetchRequest::new(CollectionKind::Game, FetchKey::Title, "mega man")
    }

    #[tokio::test]
    async fn test_search_normalizes_static_tables_and_ratings() {
        let (mock, fetcher, mut rx) = fetcher_with_mock(20);
        mock.respond_when("/v4/games", 200, fixtures::IGDB_SEARCH_MEGAMAN);
        mock.respond_when("/v4/companies", 200, fixtures::IGDB_COMPANIES);

        fetcher.search(game_request()).await.unwrap();

        let events = drain(&mut rx);
        match &events[0] {
            FetchEvent::ResultFound(result) => {
                assert_eq!(result.title, "Mega Man 3");
                assert_eq!(result.description, "1990");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!fetcher.has_more_results());

        let entry = fetcher.fetch_entry(1).await.unwrap();
        assert_eq!(entry.field("genre"), "Platform");
        assert_eq!(entry.field("platform"), "Nintendo Entertainment System");
        assert_eq!(entry.field("certification"), "Teen");
        assert_eq!(entry.field("developer"), "Capcom");
        assert_eq!(entry.field("publisher"), "Capcom");
        assert!(entry.field("description").contains("Dr. Wily"));
    }

    #[tokio::test]
    async fn test_apicalypse_body_carries_search_and_limit() {
        let (mock, fetcher, mut rx) = fetcher_with_mock(20);
        mock.respond_when("/v4/games", 200, "[]");

        fetcher.search(game_request()).await.unwrap();
        let _ = drain(&mut rx);

        let games_request = mock
            .requests()
            .into_iter()
            .find(|r| r.url.contains("/v4/games"))
            .unwrap();
        assert_eq!(games_request.method, "POST");
        assert!(games_request.body.contains("search \"mega man\";"));
        assert!(games_request.body.contains("limit 20;"));
        assert!(games_request.body.contains("offset 0;"));
        assert!(
            games_request
                .headers
                .iter()
                .any(|(name, value)| name == "Authorization" && value == "Bearer fresh-bearer")
        );
    }

    #[tokio::test]
    async fn test_auth_failure_refreshes_token_and_retries_once() {
        let (mock, fetcher, mut rx) = fetcher_with_mock(20);
        mock.push_response(401, "");
        mock.push_response(200, fixtures::IGDB_SEARCH_MEGAMAN);

        fetcher.search(game_request()).await.unwrap();

        let events = drain(&mut rx);
        assert!(matches!(events[0], FetchEvent::ResultFound(_)));

        let token_requests = mock
            .requests()
            .iter()
            .filter(|r| r.url.contains("oauth2/token"))
            .count();
        assert_eq!(token_requests, 2);
    }

    #[tokio::test]
    async fn test_refreshed_token_is_written_back_to_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("fetch.toml");

        let mock = Arc::new(MockHttpClient::new());
        mock.respond_when("oauth2/token", 200, fixtures::IGDB_TOKEN);
        mock.respond_when("/v4/games", 200, "[]");
        let (tx, mut rx) = channel();
        let fetcher = IgdbFetcher::new(
            mock.clone(),
            Arc::new(NullImageStore),
            tx,
            &IgdbConfig::default(),
            20,
        )
        .unwrap()
        .with_persistence(ConfigManager::with_path(config_path.clone()));

        fetcher.search(game_request()).await.unwrap();
        let _ = drain(&mut rx);

        let saved = ConfigManager::with_path(config_path).load().unwrap();
        assert_eq!(saved.igdb.access_token.as_deref(), Some("fresh-bearer"));
        let expires = saved.igdb.token_expires.unwrap();
        assert!(expires > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn test_pagination_by_offset_clause() {
        let (mock, fetcher, mut rx) = fetcher_with_mock(1);
        mock.push_response(200, fixtures::IGDB_SEARCH_MEGAMAN);
        mock.push_response(200, "[]");

        fetcher.search(game_request()).await.unwrap();
        assert!(fetcher.has_more_results());

        fetcher.continue_search().await.unwrap();
        assert!(!fetcher.has_more_results());

        let events = drain(&mut rx);
        let results = events
            .iter()
            .filter(|e| matches!(e, FetchEvent::ResultFound(_)))
            .count();
        let dones = events
            .iter()
            .filter(|e| matches!(e, FetchEvent::Done { .. }))
            .count();
        assert_eq!(results, 1);
        assert_eq!(dones, 2);

        let second_page = mock
            .requests()
            .into_iter()
            .filter(|r| r.url.contains("/v4/games"))
            .nth(1)
            .unwrap();
        assert!(second_page.body.contains("offset 1;"));
    }
}

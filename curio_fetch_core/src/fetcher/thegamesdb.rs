//! TheGamesDB fetcher for game collections
//!
//! Search results carry genre, developer, publisher, and platform ids that
//! must be resolved against the service's lookup endpoints. The lookups
//! change rarely, so each table lives in a [`ReferenceCache`]: loaded from
//! disk at construction, missing ids fetched in bounded batches and merged
//! in, the whole table persisted back. Id resolution is deferred to
//! hydration so a search costs one request.
//!
//! The shipped API key is a shared community default; a personal key from
//! configuration replaces it.

use crate::config::TheGamesDbConfig;
use crate::entry::{Entry, join_values};
use crate::error::{FetchError, Result};
use crate::event::{EventSender, Severity};
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::HttpClient;
use crate::normalize::{map_value_path, vocab};
use crate::ratelimit::RateLimiter;
use crate::refcache::ReferenceCache;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

const TGDB_API: &str = "https://api.thegamesdb.net";
const MIN_INTERVAL: Duration = Duration::from_millis(250);
/// The service caps the id filter list, so lookups go out in chunks
const LOOKUP_BATCH: usize = 10;

pub struct TheGamesDbFetcher {
    http: Arc<dyn HttpClient>,
    state: SearchState,
    limiter: RateLimiter,
    api_key: String,
    genres: Mutex<ReferenceCache>,
    developers: Mutex<ReferenceCache>,
    publishers: Mutex<ReferenceCache>,
    platforms: Mutex<ReferenceCache>,
    max_results: usize,
    last_query: std::sync::Mutex<String>,
}

impl TheGamesDbFetcher {
    pub const SOURCE: &'static str = "TheGamesDB";

    pub fn new(
        http: Arc<dyn HttpClient>,
        sender: EventSender,
        config: &TheGamesDbConfig,
        cache_dir: &Path,
        max_results: usize,
    ) -> Result<Self> {
        Ok(Self {
            http,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            api_key: config.effective_api_key()?,
            genres: Mutex::new(ReferenceCache::open(cache_dir, "thegamesdb", "genre")),
            developers: Mutex::new(ReferenceCache::open(cache_dir, "thegamesdb", "developer")),
            publishers: Mutex::new(ReferenceCache::open(cache_dir, "thegamesdb", "publisher")),
            platforms: Mutex::new(ReferenceCache::open(cache_dir, "thegamesdb", "platform")),
            max_results,
            last_query: std::sync::Mutex::new(String::new()),
        })
    }

    async fn run_page(&self, generation: u64, query: &str, page: u64) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(TGDB_API)?;
        url.set_path("/v1.1/Games/ByGameName");
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("name", query)
            .append_pair("fields", "players,publishers,genres,overview,rating")
            .append_pair("page", &page.to_string());

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("api.thegamesdb.net")?;
        let doc: Value = response.json()?;

        let games = doc
            .pointer("/data/games")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::payload("game search carried no data.games list"))?;

        for game in games.iter().take(self.max_results) {
            let entry = entry_from_game(game);
            let remote_id = lookup_spec(game);
            let title = entry.field("title").to_string();
            let description = entry.field("year").to_string();
            self.state.emit_result(
                generation,
                HydrationSlot::Partial { entry, remote_id },
                title,
                description,
            );
        }

        // one unit per page; the offset counter doubles as the page count
        self.state.record_page(generation, 1, None);
        let has_next = doc
            .pointer("/pages/next")
            .map(|next| !next.is_null() && next.as_str() != Some(""))
            .unwrap_or(false);
        self.state.finish_page(generation, has_next);
        Ok(())
    }

    /// Fetch any of the given ids missing from a lookup cache, in
    /// id-filtered batches, merging each reply into the cached table.
    async fn ensure_ids(
        &self,
        cache: &Mutex<ReferenceCache>,
        endpoint: &str,
        key: &str,
        ids: &str,
    ) -> Result<()> {
        let mut cache = cache.lock().await;
        let missing: Vec<&str> = ids
            .split(',')
            .filter(|id| !id.is_empty() && cache.get(id).is_none())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        for chunk in missing.chunks(LOOKUP_BATCH) {
            self.limiter.wait_if_needed().await;
            let mut url = Url::parse(TGDB_API)?;
            url.set_path(&format!("/v1/{endpoint}"));
            url.query_pairs_mut()
                .append_pair("apikey", &self.api_key)
                .append_pair("id", &chunk.join(","));

            let response = self.http.get(&url, &[]).await?;
            response.error_for_status("api.thegamesdb.net")?;
            let doc: Value = response.json()?;

            let table = doc
                .pointer(&format!("/data/{key}"))
                .ok_or_else(|| FetchError::payload(format!("{endpoint} reply carried no table")))?;
            cache.merge_payload(&table.to_string())?;
        }

        if let Err(err) = cache.persist() {
            warn!("could not persist {key} lookup cache: {err}");
        }
        Ok(())
    }

    async fn resolve(&self, cache: &Mutex<ReferenceCache>, ids: &str) -> String {
        let cache = cache.lock().await;
        join_values(
            ids.split(',')
                .filter(|id| !id.is_empty())
                .filter_map(|id| cache.get(id)),
        )
    }

    async fn hydrate(&self, remote_id: &str, mut entry: Entry) -> Result<Entry> {
        let mut parts = remote_id.split('|');
        let genre_ids = parts.next().unwrap_or("");
        let dev_ids = parts.next().unwrap_or("");
        let pub_ids = parts.next().unwrap_or("");
        let platform_id = parts.next().unwrap_or("");

        if !genre_ids.is_empty() {
            self.ensure_ids(&self.genres, "Genres", "genres", genre_ids)
                .await?;
            entry.set_field("genre", self.resolve(&self.genres, genre_ids).await);
        }
        if !dev_ids.is_empty() {
            self.ensure_ids(&self.developers, "Developers", "developers", dev_ids)
                .await?;
            entry.set_field("developer", self.resolve(&self.developers, dev_ids).await);
        }
        if !pub_ids.is_empty() {
            self.ensure_ids(&self.publishers, "Publishers", "publishers", pub_ids)
                .await?;
            entry.set_field("publisher", self.resolve(&self.publishers, pub_ids).await);
        }
        if !platform_id.is_empty() {
            self.ensure_ids(&self.platforms, "Platforms", "platforms", platform_id)
                .await?;
            entry.set_field("platform", self.resolve(&self.platforms, platform_id).await);
        }
        Ok(entry)
    }
}

fn entry_from_game(game: &Value) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("title", map_value_path(game, "game_title"));
    entry.set_field("description", map_value_path(game, "overview"));

    let released = map_value_path(game, "release_date");
    if let Some(year) = released.get(..4) {
        entry.set_field("year", year);
    }

    // ratings come as "T - Teen"; the letter code is authoritative
    let rating = map_value_path(game, "rating");
    let code = rating.split(" - ").next().unwrap_or("");
    if let Some(cert) = vocab::esrb_from_code(code) {
        entry.set_field("certification", cert);
    }
    entry
}

/// Pack the ids needing lookup: genres `|` developers `|` publishers `|`
/// platform.
fn lookup_spec(game: &Value) -> String {
    let join_ids = |key: &str| {
        game.get(key)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_u64)
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    };

    let platform = game
        .get("platform")
        .and_then(Value::as_u64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    format!(
        "{}|{}|{}|{platform}",
        join_ids("genres"),
        join_ids("developers"),
        join_ids("publishers"),
    )
}

#[async_trait]
impl Fetcher for TheGamesDbFetcher {
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
        if let Err(err) = self.run_page(generation, request.value(), 1).await {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    async fn continue_search(&self) -> Result<()> {
        let generation = self.state.begin_continue()?;
        let next_page = self.state.offset() + 1;
        let query = self.last_query.lock().expect("query lock").clone();
        if let Err(err) = self.run_page(generation, &query, next_page).await {
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
                            format!("could not resolve lookup tables: {err}"),
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

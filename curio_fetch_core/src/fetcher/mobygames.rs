//! MobyGames fetcher for game collections
//!
//! Requires a personal API key; there is no shipped default. A game record
//! lists every platform it appeared on, and the catalog treats each
//! (game, platform) pair as its own release, so search results fan out one
//! entry per platform. Ratings, companies, and covers are only available
//! from per-platform endpoints and are filled in during hydration with two
//! secondary requests, all behind the one-request-per-second gate the
//! service demands.

use crate::config::MobyGamesConfig;
use crate::credentials::ApiKey;
use crate::entry::{Entry, join_values};
use crate::error::{FetchError, Result};
use crate::event::{EventSender, Severity};
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::HttpClient;
use crate::images::ImageStore;
use crate::normalize::html::clean_fragment;
use crate::normalize::{map_value_path, vocab};
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const MOBY_API: &str = "https://api.mobygames.com";
const MIN_INTERVAL: Duration = Duration::from_millis(1000);

pub struct MobyGamesFetcher {
    http: Arc<dyn HttpClient>,
    images: Arc<dyn ImageStore>,
    state: SearchState,
    limiter: RateLimiter,
    api_key: ApiKey,
    max_results: usize,
    last_search: std::sync::Mutex<(String, Option<String>)>,
}

impl MobyGamesFetcher {
    pub const SOURCE: &'static str = "MobyGames";

    pub fn new(
        http: Arc<dyn HttpClient>,
        images: Arc<dyn ImageStore>,
        sender: EventSender,
        config: &MobyGamesConfig,
        max_results: usize,
    ) -> Result<Self> {
        Ok(Self {
            http,
            images,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            api_key: ApiKey::required("MobyGames", config.api_key.as_deref())?,
            max_results,
            last_search: std::sync::Mutex::new((String::new(), None)),
        })
    }

    async fn api_get(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Value> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(MOBY_API)?;
        url.set_path(path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key.expose());
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("api.mobygames.com")?;
        Ok(response.json()?)
    }

    async fn run_page(
        &self,
        generation: u64,
        query: &str,
        platform_filter: Option<&str>,
        offset: u64,
    ) -> Result<()> {
        let limit = self.max_results.to_string();
        let offset_string = offset.to_string();
        let mut pairs = vec![
            ("title", query),
            ("format", "normal"),
            ("limit", limit.as_str()),
            ("offset", offset_string.as_str()),
        ];
        if let Some(platform) = platform_filter {
            pairs.push(("platform", platform));
        }
        let doc = self.api_get("/v1/games", &pairs).await?;

        let games = doc
            .get("games")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::payload("game search carried no games list"))?;

        for game in games {
            let game_id = map_value_path(game, "game_id");
            if game_id.is_empty() {
                continue;
            }
            let base = base_entry(game);
            let cover = map_value_path(game, "sample_cover.image");

            let platforms = game
                .get("platforms")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for platform in platforms {
                let platform_id = map_value_path(platform, "platform_id");
                if platform_id.is_empty() {
                    continue;
                }
                // a platform filter narrows the per-platform fan-out
                if platform_filter.is_some_and(|wanted| wanted != platform_id) {
                    continue;
                }

                let mut entry = base.clone();
                entry.set_field("platform", map_value_path(platform, "platform_name"));
                let released = map_value_path(platform, "first_release_date");
                if let Some(year) = released.get(..4) {
                    entry.set_field("year", year);
                }

                let title = entry.field("title").to_string();
                let description = format!(
                    "{} ({})",
                    entry.field("platform"),
                    entry.field("year")
                );
                self.state.emit_result(
                    generation,
                    HydrationSlot::Partial {
                        entry,
                        remote_id: format!("{game_id}|{platform_id}|{cover}"),
                    },
                    title,
                    description,
                );
            }
        }

        self.state
            .record_page(generation, games.len() as u64, None);
        self.state
            .finish_page(generation, games.len() >= self.max_results);
        Ok(())
    }

    async fn hydrate(&self, remote_id: &str, mut entry: Entry) -> Result<Entry> {
        let mut parts = remote_id.split('|');
        let game_id = parts.next().unwrap_or("");
        let platform_id = parts.next().unwrap_or("");
        let cover = parts.next().unwrap_or("");

        let release = self
            .api_get(&format!("/v1/games/{game_id}/platforms/{platform_id}"), &[])
            .await?;

        if let Some(attributes) = release.get("attributes").and_then(Value::as_array) {
            for attribute in attributes {
                let category = map_value_path(attribute, "attribute_category_name");
                if !category.contains("Rating") {
                    continue;
                }
                let value = map_value_path(attribute, "attribute_name");
                if let Some(cert) = vocab::rating_from_name(&category, &value) {
                    entry.set_field("certification", cert);
                    break;
                }
            }
        }

        let mut developers = Vec::new();
        let mut publishers = Vec::new();
        if let Some(releases) = release.get("releases").and_then(Value::as_array) {
            for rel in releases {
                let Some(companies) = rel.get("companies").and_then(Value::as_array) else {
                    continue;
                };
                for company in companies {
                    let role = map_value_path(company, "role");
                    let name = map_value_path(company, "company_name");
                    if name.is_empty() {
                        continue;
                    }
                    if role.contains("Developed") {
                        developers.push(name);
                    } else if role.contains("Published") {
                        publishers.push(name);
                    }
                }
            }
        }
        entry.set_field("developer", join_values(developers));
        entry.set_field("publisher", join_values(publishers));

        // prefer the front-cover scan over the search-phase sample image
        let covers = self
            .api_get(
                &format!("/v1/games/{game_id}/platforms/{platform_id}/covers"),
                &[],
            )
            .await;
        let front = covers.ok().and_then(|doc| front_cover(&doc));
        let image = front.unwrap_or_else(|| cover.to_string());
        if let Ok(image_url) = Url::parse(&image) {
            entry.set_field("cover", self.images.store(&image_url).await);
        }

        Ok(entry)
    }
}

fn base_entry(game: &Value) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("title", map_value_path(game, "title"));

    let description = map_value_path(game, "description");
    if !description.is_empty() {
        entry.set_field("description", clean_fragment(&description));
    }

    if let Some(genres) = game.get("genres").and_then(Value::as_array) {
        let names: Vec<String> = genres
            .iter()
            .map(|genre| map_value_path(genre, "genre_name"))
            .filter(|name| !name.is_empty())
            .collect();
        entry.set_field("genre", join_values(names));
    }
    entry
}

fn front_cover(doc: &Value) -> Option<String> {
    let groups = doc.get("cover_groups")?.as_array()?;
    for group in groups {
        let Some(covers) = group.get("covers").and_then(Value::as_array) else {
            continue;
        };
        for cover in covers {
            if map_value_path(cover, "scan_of").eq_ignore_ascii_case("front cover") {
                let image = map_value_path(cover, "image");
                if !image.is_empty() {
                    return Some(image);
                }
            }
        }
    }
    None
}

#[async_trait]
impl Fetcher for MobyGamesFetcher {
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
        *self.last_search.lock().expect("query lock") = (
            request.value().to_string(),
            request.data().map(str::to_string),
        );
        if let Err(err) = self
            .run_page(generation, request.value(), request.data(), 0)
            .await
        {
            self.state.finish_error(generation, &err);
        }
        Ok(())
    }

    async fn continue_search(&self) -> Result<()> {
        let generation = self.state.begin_continue()?;
        let offset = self.state.offset();
        let (query, platform) = self.last_search.lock().expect("query lock").clone();
        if let Err(err) = self
            .run_page(generation, &query, platform.as_deref(), offset)
            .await
        {
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
                            format!("could not fetch release details: {err}"),
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

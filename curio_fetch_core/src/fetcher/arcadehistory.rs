//! Arcade History fetcher for arcade game collections
//!
//! The site has no API; search results are scraped out of the database
//! page with a pair of patterns, one for the name row and one for the
//! copyright row beneath it. The listing already carries everything the
//! entry needs, so results are parked fully hydrated. Searches are a
//! single page.

use crate::entry::Entry;
use crate::error::{FetchError, Result};
use crate::event::EventSender;
use crate::fetcher::{Fetcher, HydrationSlot, SearchState};
use crate::http::HttpClient;
use crate::normalize::html::decode_entities;
use crate::ratelimit::RateLimiter;
use crate::request::{CollectionKind, FetchKey, FetchRequest};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const ARCADE_HISTORY_SITE: &str = "https://www.arcade-history.com/index.php";
const MIN_INTERVAL: Duration = Duration::from_millis(1000);

static NAME_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class='page_datNOM'><a href="detail\.php\?lien=(\d+)"[^>]*>(.*?)</a>"#)
        .expect("name row pattern")
});
static COPYRIGHT_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<div class='page_datDAT'>(.*?)</div>").expect("copyright row pattern"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern"));

pub struct ArcadeHistoryFetcher {
    http: Arc<dyn HttpClient>,
    state: SearchState,
    limiter: RateLimiter,
    max_results: usize,
}

impl ArcadeHistoryFetcher {
    pub const SOURCE: &'static str = "Arcade History";

    pub fn new(http: Arc<dyn HttpClient>, sender: EventSender, max_results: usize) -> Self {
        Self {
            http,
            state: SearchState::new(Self::SOURCE, sender),
            limiter: RateLimiter::new(MIN_INTERVAL),
            max_results,
        }
    }

    async fn run_search(&self, generation: u64, query: &str) -> Result<()> {
        self.limiter.wait_if_needed().await;

        let mut url = Url::parse(ARCADE_HISTORY_SITE)?;
        url.query_pairs_mut()
            .append_pair("page", "database")
            .append_pair("lemot", query);

        let response = self.http.get(&url, &[]).await?;
        response.error_for_status("arcade-history.com")?;

        for game in scrape_listing(&response.body).into_iter().take(self.max_results) {
            let title = game.entry.field("title").to_string();
            let description = game.copyright.clone();
            self.state.emit_result(
                generation,
                HydrationSlot::Hydrated(game.entry),
                title,
                description,
            );
        }
        self.state.finish_page(generation, false);
        Ok(())
    }
}

struct ScrapedGame {
    entry: Entry,
    copyright: String,
}

/// Pair each name row with the copyright row that follows it.
fn scrape_listing(html: &str) -> Vec<ScrapedGame> {
    let copyrights: Vec<String> = COPYRIGHT_ROW
        .captures_iter(html)
        .map(|caps| decode_entities(&caps[1]))
        .collect();

    NAME_ROW
        .captures_iter(html)
        .enumerate()
        .map(|(index, caps)| {
            let name = decode_entities(&caps[2]);
            let copyright = copyrights.get(index).cloned().unwrap_or_default();

            let mut entry = Entry::new();
            entry.set_field("title", title_of(&name));
            entry.set_field("platform", "Arcade");
            if let Some(year) = YEAR.find(&copyright) {
                entry.set_field("year", year.as_str());
                entry.set_field("publisher", publisher_of(&copyright, year.end()));
            }
            ScrapedGame { entry, copyright }
        })
        .collect()
}

/// Name rows read "Title © Manufacturer"; keep the part before the mark.
fn title_of(name: &str) -> String {
    name.split('\u{a9}').next().unwrap_or(name).trim().to_string()
}

fn publisher_of(copyright: &str, after_year: usize) -> String {
    copyright[after_year..]
        .trim_start_matches([',', '.', ' '])
        .trim()
        .to_string()
}

#[async_trait]
impl Fetcher for ArcadeHistoryFetcher {
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
        if let Err(err) = self.run_search(generation, request.value()).await {
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

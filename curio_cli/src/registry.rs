//! Builds the fetcher registry from configuration
//!
//! Sources with shipped default keys are always registered; sources that
//! need user-supplied configuration (a MobyGames key, a catalog host) are
//! skipped quietly when it is absent.

use crate::pipelines::{BoardGameGeekStylesheet, MusicBrainzStylesheet};
use crate::prompt::TerminalPrompt;
use crate::store::UrlImageStore;
use anyhow::{Context, Result};
use curio_fetch_core::config::{ConfigManager, FetchConfig};
use curio_fetch_core::event::EventSender;
use curio_fetch_core::fetcher::{
    ArcadeHistoryFetcher, BoardGameGeekFetcher, IgdbFetcher, MobyGamesFetcher,
    MusicBrainzFetcher, OpacFetcher, TheGamesDbFetcher, TvmazeFetcher,
};
use curio_fetch_core::http::ReqwestClient;
use curio_fetch_core::refcache::ReferenceCache;
use curio_fetch_core::{FetchManager, Fetcher};
use log::debug;
use std::sync::Arc;

/// Register every source the configuration allows. All fetchers share one
/// event channel.
pub async fn build_manager(
    config: &FetchConfig,
    sender: EventSender,
    config_manager: ConfigManager,
) -> Result<FetchManager> {
    let http = Arc::new(ReqwestClient::new().context("http client setup failed")?);
    let images = Arc::new(UrlImageStore);
    let max_results = config.general.max_results;

    let mut manager = FetchManager::new();

    manager.register(Arc::new(TvmazeFetcher::new(
        http.clone(),
        images.clone(),
        sender.clone(),
        max_results,
    )));

    let igdb = IgdbFetcher::new(
        http.clone(),
        images.clone(),
        sender.clone(),
        &config.igdb,
        max_results,
    )
    .context("IGDB setup failed")?
    .with_persistence(config_manager);
    igdb.restore_token(&config.igdb).await;
    manager.register(Arc::new(igdb));

    manager.register(Arc::new(
        TheGamesDbFetcher::new(
            http.clone(),
            sender.clone(),
            &config.thegamesdb,
            &ReferenceCache::default_dir(),
            max_results,
        )
        .context("TheGamesDB setup failed")?,
    ));

    match MobyGamesFetcher::new(
        http.clone(),
        images.clone(),
        sender.clone(),
        &config.mobygames,
        max_results,
    ) {
        Ok(fetcher) => manager.register(Arc::new(fetcher)),
        Err(err) => debug!("MobyGames not registered: {err}"),
    }

    manager.register(Arc::new(MusicBrainzFetcher::new(
        http.clone(),
        Arc::new(MusicBrainzStylesheet),
        sender.clone(),
        max_results,
    )));

    manager.register(Arc::new(BoardGameGeekFetcher::new(
        http.clone(),
        Arc::new(BoardGameGeekStylesheet),
        sender.clone(),
        max_results,
    )));

    manager.register(Arc::new(ArcadeHistoryFetcher::new(
        http.clone(),
        sender.clone(),
        max_results,
    )));

    match OpacFetcher::from_config(
        &config.opac,
        Box::new(TerminalPrompt::new(config.opac.user.clone())),
        sender,
        max_results,
    ) {
        Ok(fetcher) => manager.register(Arc::new(fetcher) as Arc<dyn Fetcher>),
        Err(err) => debug!("catalog not registered: {err}"),
    }

    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_fetch_core::event::channel;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config_registers_keyless_sources() {
        let dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::with_path(dir.path().join("fetch.toml"));
        let config = config_manager.load().unwrap();

        let (tx, _rx) = channel();
        let manager = build_manager(&config, tx, config_manager).await.unwrap();

        let sources = manager.sources();
        assert!(sources.contains(&"TVmaze"));
        assert!(sources.contains(&"IGDB"));
        assert!(sources.contains(&"TheGamesDB"));
        assert!(sources.contains(&"MusicBrainz"));
        assert!(sources.contains(&"BoardGameGeek"));
        assert!(sources.contains(&"Arcade History"));

        // these two need user configuration
        assert!(!sources.contains(&"MobyGames"));
        assert!(!sources.contains(&"Library Catalog"));
    }

    #[tokio::test]
    async fn test_configured_catalog_is_registered() {
        let dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::with_path(dir.path().join("fetch.toml"));
        let mut config = config_manager.load().unwrap();
        config.opac.host = "opac.example.edu".to_string();
        config.mobygames.api_key = Some("moby-key".to_string());

        let (tx, _rx) = channel();
        let manager = build_manager(&config, tx, config_manager).await.unwrap();

        assert!(manager.sources().contains(&"MobyGames"));
        assert!(manager.sources().contains(&"Library Catalog"));
    }
}

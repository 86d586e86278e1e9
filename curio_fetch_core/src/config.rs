//! Layered configuration for fetch sources
//!
//! Configuration is resolved with layered priority: environment variables
//! over the TOML config file over built-in defaults. Each source gets its
//! own table so API keys, hosts, and refreshed tokens stay separate.
//!
//! Scrambled default keys are shipped in the defaults layer rather than
//! compiled into the fetchers, so a deployment can replace them without a
//! rebuild. The scramble is reversible hex, a speed bump and not a secrecy
//! mechanism.

use crate::error::{FetchError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct FetchConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub tvmaze: TvmazeConfig,

    #[serde(default)]
    pub igdb: IgdbConfig,

    #[serde(default)]
    pub thegamesdb: TheGamesDbConfig,

    #[serde(default)]
    pub mobygames: MobyGamesConfig,

    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,

    #[serde(default)]
    pub boardgamegeek: BoardGameGeekConfig,

    #[serde(default)]
    pub arcadehistory: ArcadeHistoryConfig,

    #[serde(default)]
    pub opac: OpacConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeneralConfig {
    /// Maximum results emitted per search page
    pub max_results: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct TvmazeConfig {}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IgdbConfig {
    /// Scrambled default client id, replaced by a user key when set
    pub scrambled_client_id: String,
    pub client_id: Option<String>,
    /// Bearer token refreshed at runtime and persisted across sessions
    pub access_token: Option<String>,
    /// Token expiry as unix seconds
    pub token_expires: Option<i64>,
    /// Cover rendition requested from the image CDN
    pub image_size: String,
}

impl Default for IgdbConfig {
    fn default() -> Self {
        Self {
            scrambled_client_id: scramble("t0ps3kritklientid"),
            client_id: None,
            access_token: None,
            token_expires: None,
            image_size: "cover_big".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TheGamesDbConfig {
    pub scrambled_api_key: String,
    pub api_key: Option<String>,
}

impl Default for TheGamesDbConfig {
    fn default() -> Self {
        Self {
            scrambled_api_key: scramble("c0mmunal-default-key"),
            api_key: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct MobyGamesConfig {
    /// Required user key, no shipped default
    pub api_key: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct MusicBrainzConfig {}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct BoardGameGeekConfig {}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct ArcadeHistoryConfig {}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OpacConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
}

impl Default for OpacConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 210,
            user: None,
        }
    }
}

/// Reversible hex scramble for shipped default keys.
///
/// Bytes are hex encoded after a fixed xor, enough to keep keys out of a
/// casual strings dump and nothing more.
pub fn scramble(plain: &str) -> String {
    let xored: Vec<u8> = plain.bytes().map(|b| b ^ 0x5a).collect();
    hex::encode(xored)
}

/// Invert [`scramble`].
pub fn unscramble(scrambled: &str) -> Result<String> {
    let bytes =
        hex::decode(scrambled).map_err(|e| FetchError::config(format!("bad scrambled key: {e}")))?;
    let plain: Vec<u8> = bytes.into_iter().map(|b| b ^ 0x5a).collect();
    String::from_utf8(plain).map_err(|e| FetchError::config(format!("bad scrambled key: {e}")))
}

/// Handles the XDG-compliant config path and layered load/save
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Use a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    fn default_config_path() -> PathBuf {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("curio/fetch.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("curio/fetch.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<FetchConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(FetchConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("CURIO_").split("__"));

        Ok(figment.extract()?)
    }

    /// Persist the full configuration, creating parent directories as needed.
    ///
    /// Used when a fetcher refreshes a bearer token that must survive the
    /// session.
    pub fn save(&self, config: &FetchConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| FetchError::config(format!("serialize config: {e}")))?;
        fs::write(&self.config_path, toml_string)?;
        Ok(())
    }
}

impl IgdbConfig {
    /// Effective client id: the user's own key when configured, otherwise
    /// the unscrambled shipped default.
    pub fn effective_client_id(&self) -> Result<String> {
        match &self.client_id {
            Some(id) if !id.is_empty() => Ok(id.clone()),
            _ => unscramble(&self.scrambled_client_id),
        }
    }
}

impl TheGamesDbConfig {
    pub fn effective_api_key(&self) -> Result<String> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(key.clone()),
            _ => unscramble(&self.scrambled_api_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scramble_round_trip() {
        let plain = "abc123-XYZ";
        let scrambled = scramble(plain);
        assert_ne!(scrambled, plain);
        assert_eq!(unscramble(&scrambled).unwrap(), plain);
    }

    #[test]
    fn test_unscramble_rejects_bad_hex() {
        assert!(matches!(
            unscramble("not hex"),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("fetch.toml"));

        let config = manager.load().unwrap();
        assert_eq!(config.general.max_results, 20);
        assert!(config.mobygames.api_key.is_none());
        assert_eq!(config.opac.port, 210);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fetch.toml");
        fs::write(
            &path,
            "[general]\nmax_results = 5\n\n[mobygames]\napi_key = \"moby-key\"\n",
        )
        .unwrap();

        let config = ConfigManager::with_path(path).load().unwrap();
        assert_eq!(config.general.max_results, 5);
        assert_eq!(config.mobygames.api_key.as_deref(), Some("moby-key"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested/fetch.toml"));

        let mut config = manager.load().unwrap();
        config.igdb.access_token = Some("fresh-token".to_string());
        config.igdb.token_expires = Some(1_900_000_000);
        manager.save(&config).unwrap();

        let reloaded = manager.load().unwrap();
        assert_eq!(reloaded.igdb.access_token.as_deref(), Some("fresh-token"));
        assert_eq!(reloaded.igdb.token_expires, Some(1_900_000_000));
    }

    #[test]
    fn test_user_key_wins_over_shipped_default() {
        let mut config = TheGamesDbConfig::default();
        assert_eq!(
            config.effective_api_key().unwrap(),
            "c0mmunal-default-key"
        );

        config.api_key = Some("my-own-key".to_string());
        assert_eq!(config.effective_api_key().unwrap(), "my-own-key");
    }
}

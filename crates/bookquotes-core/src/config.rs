//! Application configuration management.
//!
//! The configuration holds where the cache database and book catalog live,
//! how to reach the quote API, and whether the user switched to offline mode.
//!
//! Configuration is stored at `~/.config/book-quotes-hub/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::client::{DEFAULT_API_HOST, DEFAULT_BASE_URL};
use crate::asset::BookAsset;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "book-quotes-hub";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Database file name inside the data directory
const DATABASE_FILE: &str = "book_quotes_hub.db";

/// Environment variables that override the config file.
pub const ENV_API_KEY: &str = "BOOKQUOTES_API_KEY";
pub const ENV_API_HOST: &str = "BOOKQUOTES_API_HOST";
pub const ENV_API_BASE_URL: &str = "BOOKQUOTES_API_BASE_URL";
pub const ENV_DATABASE: &str = "BOOKQUOTES_DATABASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache database; `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Book catalog file; `None` uses the catalog compiled into the binary.
    pub books_asset_path: Option<PathBuf>,
    pub api_base_url: String,
    pub api_host: String,
    /// RapidAPI key. When unset the key is looked up in the OS keychain.
    pub api_key: Option<String>,
    pub offline_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            books_asset_path: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: None,
            offline_mode: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The configured database path, or the default under the data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.database_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(DATABASE_FILE))
    }

    pub fn book_asset(&self) -> BookAsset {
        BookAsset::from_path(self.books_asset_path.clone())
    }

    /// Load `.env` if present, then apply the `BOOKQUOTES_*` overrides.
    pub fn apply_env(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "Failed to load .env file");
            }
        }
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(host) = get(ENV_API_HOST) {
            self.api_host = host;
        }
        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(path) = get(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from(&dir.path().join("config.json")).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.book_asset(), BookAsset::Bundled);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            database_path: Some(dir.path().join("cache.db")),
            offline_mode: true,
            ..Config::default()
        };
        config.save_to(&path).expect("save");

        assert_eq!(Config::load_from(&path).expect("load"), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"offline_mode": true}"#).expect("write");

        let config = Config::load_from(&path).expect("load");
        assert!(config.offline_mode);
        assert_eq!(config.api_host, DEFAULT_API_HOST);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "secret"),
            (ENV_API_HOST, " "),
            (ENV_DATABASE, "/tmp/quotes.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.database_path().expect("path"),
            PathBuf::from("/tmp/quotes.db")
        );
    }

    #[test]
    fn test_books_asset_path_selects_file() {
        let config = Config {
            books_asset_path: Some(PathBuf::from("/data/books.json")),
            ..Config::default()
        };
        assert_eq!(config.book_asset(), BookAsset::File(PathBuf::from("/data/books.json")));
    }
}

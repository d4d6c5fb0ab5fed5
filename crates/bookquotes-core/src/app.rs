//! Composition root for Book & Quotes Hub.
//!
//! `App` opens the cache database, builds the quote API client and network
//! monitor, and wires the repositories and view models together once so
//! every screen shares the same instances.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::QuoteApiClient;
use crate::config::Config;
use crate::credentials::ApiKeyStore;
use crate::net::NetworkMonitor;
use crate::repository::{CachedBookRepository, QuoteRepository};
use crate::state::TaskScope;
use crate::store::{CachedAt, SqliteStore};
use crate::viewmodel::{BookViewModel, QuoteViewModel};

/// Shown for a cache that has never been filled.
pub const NEVER_SYNCED: &str = "never";

/// How old each cache is, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheAges {
    pub books: String,
    pub quotes: String,
}

impl Default for CacheAges {
    fn default() -> Self {
        Self {
            books: NEVER_SYNCED.to_string(),
            quotes: NEVER_SYNCED.to_string(),
        }
    }
}

pub struct App {
    config: Mutex<Config>,
    config_path: PathBuf,
    monitor: Arc<NetworkMonitor>,
    books: Arc<CachedBookRepository>,
    quotes: Arc<QuoteRepository>,
    book_view_model: Arc<BookViewModel>,
    quote_view_model: Arc<QuoteViewModel>,
    tasks: TaskScope,
}

impl App {
    /// Build the app, persisting config changes to the default config file.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_config_path(config, Config::config_path()?)
    }

    pub fn with_config_path(config: Config, config_path: PathBuf) -> Result<Self> {
        let database_path = config.database_path()?;
        let store = Arc::new(
            SqliteStore::open(&database_path)
                .with_context(|| format!("Failed to open cache at {}", database_path.display()))?,
        );

        let client = QuoteApiClient::new(&config.api_base_url, resolve_api_key(&config), config.api_host.clone())?;
        if !client.has_api_key() {
            warn!("No RapidAPI key configured, quote requests will be rejected");
        }

        let monitor = Arc::new(NetworkMonitor::for_url(client.base_url()));
        monitor.set_offline_mode(config.offline_mode);

        let books = Arc::new(CachedBookRepository::new(store.clone(), config.book_asset()));
        let quotes = Arc::new(QuoteRepository::new(Arc::new(client), store, monitor.clone()));

        info!(
            database = %database_path.display(),
            offline_mode = config.offline_mode,
            "Book & Quotes Hub initialized"
        );

        Ok(Self {
            book_view_model: Arc::new(BookViewModel::new(books.clone())),
            quote_view_model: Arc::new(QuoteViewModel::new(quotes.clone())),
            config: Mutex::new(config),
            config_path,
            monitor,
            books,
            quotes,
            tasks: TaskScope::new(),
        })
    }

    pub fn book_view_model(&self) -> &Arc<BookViewModel> {
        &self.book_view_model
    }

    pub fn quote_view_model(&self) -> &Arc<QuoteViewModel> {
        &self.quote_view_model
    }

    pub fn config(&self) -> Config {
        self.config.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Startup loads: the book list and the first page of quotes.
    pub async fn initial_load(&self) {
        tokio::join!(
            self.book_view_model.load_books(),
            self.quote_view_model.load_next_page(),
        );
    }

    /// Run `initial_load` in the background. Cancelled by `shutdown`.
    pub fn start(&self) {
        let books = Arc::clone(&self.book_view_model);
        let quotes = Arc::clone(&self.quote_view_model);
        self.tasks.launch(async move {
            tokio::join!(books.load_books(), quotes.load_next_page());
        });
    }

    /// Wait for background work started by `start`.
    pub async fn wait_idle(&self) {
        self.tasks.join_all().await;
    }

    /// Abort background work started by `start`.
    pub fn shutdown(&self) {
        self.tasks.cancel_all();
    }

    pub async fn cache_ages(&self) -> CacheAges {
        CacheAges {
            books: age_or_never(self.books.last_refreshed().await),
            quotes: age_or_never(self.quotes.last_synced(None).await),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.monitor.offline_mode()
    }

    /// Enter offline mode - every quote load reads the cache only.
    pub fn go_offline(&self) -> Result<()> {
        info!("Entering offline mode");
        self.set_offline_mode(true)
    }

    /// Exit offline mode - quote loads go back to the network.
    pub fn go_online(&self) -> Result<()> {
        info!("Exiting offline mode");
        self.set_offline_mode(false)
    }

    fn set_offline_mode(&self, offline: bool) -> Result<()> {
        self.monitor.set_offline_mode(offline);
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        config.offline_mode = offline;
        config.save_to(&self.config_path)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.tasks.cancel_all();
    }
}

fn resolve_api_key(config: &Config) -> String {
    if let Some(ref key) = config.api_key {
        return key.clone();
    }
    match ApiKeyStore::get() {
        Ok(key) => key,
        Err(e) => {
            debug!(error = %format!("{:#}", e), "No API key in keychain");
            String::new()
        }
    }
}

fn age_or_never(synced: Result<Option<CachedAt>>) -> String {
    match synced {
        Ok(Some(at)) => at.age_display(),
        Ok(None) => NEVER_SYNCED.to_string(),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Failed to read sync log");
            NEVER_SYNCED.to_string()
        }
    }
}

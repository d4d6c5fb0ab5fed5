use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::QuoteSource;
use crate::models::{normalize_category, Quote, QuoteItem};
use crate::net::Connectivity;
use crate::state::StateHolder;
use crate::store::{blocking, quotes_sync_key, CachedAt, QuoteStore};

pub const EMPTY_FROM_SERVER_MESSAGE: &str = "No quotes available from the server for this category.";
pub const OFFLINE_MESSAGE: &str = "No internet connection. Loading cached quotes.";
pub const NO_CACHED_QUOTES_MESSAGE: &str = "No cached quotes available for this category.";

/// Read-through cache for quotes.
///
/// Each load mirrors the requested category from the quote API into the
/// store (when online) and then republishes the store's view of that
/// category. Failures never escape `load_quotes`; they end up in
/// `error_message` while the cached quotes stay visible.
pub struct QuoteRepository {
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn QuoteStore>,
    connectivity: Arc<dyn Connectivity>,

    current_quotes: StateHolder<Vec<Quote>>,
    is_loading: StateHolder<bool>,
    error_message: StateHolder<Option<String>>,

    // The API returns whole categories, so this is set after every fetch.
    last_page_reached: AtomicBool,
}

impl QuoteRepository {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn QuoteStore>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            source,
            store,
            connectivity,
            current_quotes: StateHolder::new(Vec::new()),
            is_loading: StateHolder::new(false),
            error_message: StateHolder::new(None),
            last_page_reached: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Observable state
    // =========================================================================

    /// Quotes for the most recently loaded category, projected for the UI.
    pub fn quotes(&self) -> Vec<QuoteItem> {
        self.current_quotes.with(|quotes| quotes.iter().map(QuoteItem::from).collect())
    }

    pub fn with_quotes<R>(&self, f: impl FnOnce(&[Quote]) -> R) -> R {
        self.current_quotes.with(|quotes| f(quotes))
    }

    pub fn subscribe_quotes(&self) -> watch::Receiver<Vec<Quote>> {
        self.current_quotes.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.is_loading.subscribe()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_message.get()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error_message.subscribe()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load quotes for `category` (`None`, blank or "All Quotes" = all).
    ///
    /// A call made while another load is running is ignored unless
    /// `force_refresh` is set. Forcing a load of all quotes clears the cached
    /// quotes first.
    pub async fn load_quotes(&self, category: Option<&str>, force_refresh: bool) {
        // Not atomic: only guards against re-entry from the same caller path
        if self.is_loading.get() && !force_refresh {
            debug!(category = ?category, "Quote load already in progress, skipping");
            return;
        }
        self.is_loading.set(true);
        self.error_message.set(None);

        let category = normalize_category(category);

        if force_refresh {
            self.last_page_reached.store(false, Ordering::SeqCst);
            if category.is_none() {
                if let Err(e) = blocking(&self.store, |s| s.clear_quotes()).await {
                    warn!(error = %e, "Failed to clear cached quotes before refresh");
                }
            }
        }

        let online = self.connectivity.is_online().await;
        if online {
            if let Err(e) = self.fetch_and_cache(category.as_deref()).await {
                error!(category = ?category, error = %format!("{:#}", e), "Error fetching quotes from API");
                self.error_message.set(Some(format!(
                    "Failed to load quotes from network: {:#}. Loading from cache.",
                    e
                )));
            }
        } else {
            info!(category = ?category, "No internet, loading quotes from cache");
            self.error_message.set(Some(OFFLINE_MESSAGE.to_string()));
        }

        self.publish_from_store(category.as_deref(), online).await;
        self.is_loading.set(false);
    }

    async fn fetch_and_cache(&self, category: Option<&str>) -> Result<()> {
        info!(category = ?category, "Fetching quotes from API");
        let response = match category {
            Some(c) => self.source.quotes_by_category(c).await?,
            None => self.source.all_quotes().await?,
        };
        let quotes = response.into_quotes();

        if quotes.is_empty() {
            self.last_page_reached.store(true, Ordering::SeqCst);
            let key = category.map(str::to_string);
            let cached = blocking(&self.store, move |s| s.quote_count_for_category(key.as_deref())).await?;
            warn!(category = ?category, cached, "Server returned no quotes");
            if cached == 0 {
                self.error_message.set(Some(EMPTY_FROM_SERVER_MESSAGE.to_string()));
            }
            return Ok(());
        }

        let count = quotes.len();
        blocking(&self.store, move |s| s.insert_quotes(&quotes)).await?;
        self.last_page_reached.store(true, Ordering::SeqCst);
        info!(category = ?category, count, "Cached quotes from API");

        let key = quotes_sync_key(category);
        if let Err(e) = blocking(&self.store, move |s| s.record_sync(&key, Utc::now())).await {
            warn!(error = %e, "Failed to record quote sync time");
        }
        Ok(())
    }

    async fn publish_from_store(&self, category: Option<&str>, online: bool) {
        let key = category.map(str::to_string);
        let result = blocking(&self.store, move |s| match key.as_deref() {
            Some(c) => s.quotes_by_category(c),
            None => s.all_quotes(),
        })
        .await;

        match result {
            Ok(quotes) => {
                let empty = quotes.is_empty();
                debug!(category = ?category, count = quotes.len(), "Publishing cached quotes");
                self.current_quotes.set(quotes);
                if empty && !online {
                    self.error_message.set(Some(NO_CACHED_QUOTES_MESSAGE.to_string()));
                }
            }
            Err(e) => {
                error!(category = ?category, error = %format!("{:#}", e), "Failed to read cached quotes");
                self.error_message
                    .set(Some(format!("Failed to read cached quotes: {:#}", e)));
            }
        }
    }

    // =========================================================================
    // Details and pagination
    // =========================================================================

    /// Look a cached quote up by its API id. Never touches the network.
    pub async fn get_quote_details(&self, id: i64) -> Result<Option<QuoteItem>> {
        self.error_message.set(None);
        let quote = blocking(&self.store, move |s| s.quote_by_id(id)).await?;
        Ok(quote.map(QuoteItem::from))
    }

    pub fn reset_pagination(&self) {
        self.last_page_reached.store(false, Ordering::SeqCst);
    }

    pub fn is_last_page(&self) -> bool {
        self.last_page_reached.load(Ordering::SeqCst)
    }

    /// When quotes for `category` were last fetched from the API.
    pub async fn last_synced(&self, category: Option<&str>) -> Result<Option<CachedAt>> {
        let key = quotes_sync_key(normalize_category(category).as_deref());
        blocking(&self.store, move |s| s.last_sync(&key)).await
    }
}

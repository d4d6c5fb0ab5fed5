//! Local SQLite cache for offline access.
//!
//! The repositories only talk to the `BookStore` and `QuoteStore` ports;
//! `SqliteStore` implements both over a single connection. Every table is a
//! mirror of an upstream source (the bundled asset or the quote API), so a
//! lost database only costs a refresh.
//!
//! Store calls block, so async callers go through [`blocking`] which runs
//! them on Tokio's blocking pool.

pub mod sqlite;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{Book, Quote};
use crate::utils::format_age_minutes;

pub use sqlite::SqliteStore;

/// Sync log entry for the book catalog.
pub const BOOKS_SYNC_KEY: &str = "books";

/// Sync log entry for a quote category (`None` = all quotes).
pub fn quotes_sync_key(category: Option<&str>) -> String {
    match category {
        Some(c) => format!("quotes:{}", c.to_lowercase()),
        None => "quotes".to_string(),
    }
}

/// When a table was last synchronized from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAt {
    pub synced_at: DateTime<Utc>,
}

impl CachedAt {
    pub fn new(synced_at: DateTime<Utc>) -> Self {
        Self { synced_at }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.synced_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age_minutes(self.age_minutes())
    }
}

/// Records when each cached table was last refreshed.
pub trait SyncLog: Send + Sync {
    fn record_sync(&self, name: &str, at: DateTime<Utc>) -> Result<()>;
    fn last_sync(&self, name: &str) -> Result<Option<CachedAt>>;
}

/// Persistent storage for books, keyed by ISBN.
pub trait BookStore: SyncLog {
    /// Insert books, replacing any existing row with the same ISBN.
    fn insert_books(&self, books: &[Book]) -> Result<()>;
    fn all_books(&self) -> Result<Vec<Book>>;
    /// Case-insensitive ISBN lookup.
    fn book_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;
    fn clear_books(&self) -> Result<()>;
}

/// Persistent storage for quotes, unique by API id.
pub trait QuoteStore: SyncLog {
    /// Insert quotes, replacing any existing row with the same API id.
    fn insert_quotes(&self, quotes: &[Quote]) -> Result<()>;
    /// All quotes ordered by API id.
    fn all_quotes(&self) -> Result<Vec<Quote>>;
    fn quote_by_id(&self, id: i64) -> Result<Option<Quote>>;
    /// Quotes in `category` (case-insensitive) ordered by API id.
    fn quotes_by_category(&self, category: &str) -> Result<Vec<Quote>>;
    fn clear_quotes(&self) -> Result<()>;
    /// Number of quotes in `category`, or in the whole table for `None`.
    fn quote_count_for_category(&self, category: Option<&str>) -> Result<usize>;
}

/// Run a store operation on the blocking pool.
pub(crate) async fn blocking<S, T, F>(store: &Arc<S>, f: F) -> Result<T>
where
    S: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .context("Store task did not complete")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_quotes_sync_key() {
        assert_eq!(quotes_sync_key(None), "quotes");
        assert_eq!(quotes_sync_key(Some("Nature")), "quotes:nature");
    }

    #[test]
    fn test_cached_at_age_display() {
        let fresh = CachedAt::new(Utc::now());
        assert_eq!(fresh.age_display(), "just now");
        assert!(fresh.age_minutes() <= 1);

        let old = CachedAt::new(Utc::now() - Duration::minutes(45));
        assert_eq!(old.age_display(), "45m ago");
    }

    #[tokio::test]
    async fn test_blocking_runs_store_call() {
        let store: Arc<dyn QuoteStore> =
            Arc::new(SqliteStore::open_in_memory().expect("in-memory store"));
        let count = blocking(&store, |s| s.quote_count_for_category(None))
            .await
            .expect("count");
        assert_eq!(count, 0);
    }
}

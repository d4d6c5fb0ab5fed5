use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::asset::BookAsset;
use crate::models::Book;
use crate::store::{blocking, BookStore, CachedAt, BOOKS_SYNC_KEY};

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Cached books, or a fresh load from the asset when the cache is empty.
    async fn get_all_books(&self) -> Result<Vec<Book>>;

    /// Look a book up by ISBN, ignoring case.
    async fn get_book_by_id(&self, isbn: &str) -> Result<Option<Book>>;

    /// Replace the cache with the asset's contents.
    async fn refresh_books(&self) -> Result<Vec<Book>>;
}

/// Book repository backed by the local store, filled from the catalog asset.
///
/// Asset failures never surface as errors: they are logged and treated as an
/// empty catalog. Store failures do propagate.
pub struct CachedBookRepository {
    store: Arc<dyn BookStore>,
    asset: BookAsset,
}

impl CachedBookRepository {
    pub fn new(store: Arc<dyn BookStore>, asset: BookAsset) -> Self {
        Self { store, asset }
    }

    async fn read_books_from_asset(&self) -> Vec<Book> {
        match self.asset.load_async().await {
            Ok(books) => books,
            Err(e) => {
                error!(asset = ?self.asset, error = %format!("{:#}", e), "Failed to read books from asset");
                Vec::new()
            }
        }
    }

    /// When the book cache was last rebuilt from the asset.
    pub async fn last_refreshed(&self) -> Result<Option<CachedAt>> {
        blocking(&self.store, |s| s.last_sync(BOOKS_SYNC_KEY)).await
    }
}

#[async_trait]
impl BookRepository for CachedBookRepository {
    async fn get_all_books(&self) -> Result<Vec<Book>> {
        let cached = blocking(&self.store, |s| s.all_books()).await?;
        if !cached.is_empty() {
            debug!(count = cached.len(), "Loading books from cache");
            return Ok(cached);
        }
        self.refresh_books().await
    }

    async fn get_book_by_id(&self, isbn: &str) -> Result<Option<Book>> {
        let key = isbn.to_string();
        if let Some(book) = blocking(&self.store, move |s| s.book_by_isbn(&key)).await? {
            debug!(isbn, "Loading book from cache");
            return Ok(Some(book));
        }

        debug!(isbn, "Book not in cache, searching asset");
        let found = self
            .read_books_from_asset()
            .await
            .into_iter()
            .find(|b| b.isbn_matches(isbn));

        if let Some(ref book) = found {
            let record = vec![book.clone()];
            blocking(&self.store, move |s| s.insert_books(&record)).await?;
            debug!(isbn, "Book found in asset and cached");
        }
        Ok(found)
    }

    async fn refresh_books(&self) -> Result<Vec<Book>> {
        info!("Refreshing books: clearing cache and reloading from asset");
        blocking(&self.store, |s| s.clear_books()).await?;

        let books = self.read_books_from_asset().await;
        if books.is_empty() {
            warn!("No books found in asset to refresh");
        } else {
            let records = books.clone();
            blocking(&self.store, move |s| s.insert_books(&records)).await?;
            info!(count = books.len(), "Inserted books from asset into cache");
        }

        if let Err(e) = blocking(&self.store, |s| s.record_sync(BOOKS_SYNC_KEY, Utc::now())).await {
            warn!(error = %e, "Failed to record book refresh time");
        }
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            authors: vec!["Satnam Alag".to_string()],
            ..Default::default()
        }
    }

    fn asset_file(books: &[Book]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        let json = serde_json::to_string(books).expect("encode");
        file.write_all(json.as_bytes()).expect("write");
        file
    }

    fn repo(asset: BookAsset) -> (Arc<SqliteStore>, CachedBookRepository) {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        let repo = CachedBookRepository::new(store.clone(), asset);
        (store, repo)
    }

    #[tokio::test]
    async fn test_get_all_books_prefers_cache_over_asset() {
        let file = asset_file(&[book("2", "From Asset")]);
        let (store, repo) = repo(BookAsset::File(file.path().to_path_buf()));
        store.insert_books(&[book("1", "From Cache")]).expect("seed");

        let books = repo.get_all_books().await.expect("books");
        assert_eq!(books, vec![book("1", "From Cache")]);
        assert!(store.book_by_isbn("2").expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_get_all_books_fills_empty_cache_from_asset() {
        let file = asset_file(&[book("1", "A"), book("2", "B")]);
        let (store, repo) = repo(BookAsset::File(file.path().to_path_buf()));

        let books = repo.get_all_books().await.expect("books");
        assert_eq!(books.len(), 2);
        assert_eq!(store.all_books().expect("all"), books);
    }

    #[tokio::test]
    async fn test_refresh_books_mirrors_asset_and_is_idempotent() {
        let file = asset_file(&[book("1", "A"), book("2", "B")]);
        let (store, repo) = repo(BookAsset::File(file.path().to_path_buf()));
        store.insert_books(&[book("9", "Stale")]).expect("seed");

        let first = repo.refresh_books().await.expect("refresh");
        let after_first = store.all_books().expect("all");
        let second = repo.refresh_books().await.expect("refresh");
        let after_second = store.all_books().expect("all");

        assert_eq!(first, second);
        assert_eq!(after_first, first);
        assert_eq!(after_second, after_first);
        assert!(repo.last_refreshed().await.expect("sync").is_some());
    }

    #[tokio::test]
    async fn test_asset_failure_yields_empty_list() {
        let (store, repo) = repo(BookAsset::File("/no/such/books.json".into()));
        store.insert_books(&[book("1", "Old")]).expect("seed");

        let books = repo.refresh_books().await.expect("refresh never fails on asset errors");
        assert!(books.is_empty());
        assert_eq!(store.book_count().expect("count"), 0);

        assert!(repo.get_all_books().await.expect("books").is_empty());
    }

    #[tokio::test]
    async fn test_get_book_by_id_cache_hit() {
        let (store, repo) = repo(BookAsset::File("/no/such/books.json".into()));
        store.insert_books(&[book("193518217X", "OSGi in Depth")]).expect("seed");

        let found = repo.get_book_by_id("193518217x").await.expect("lookup");
        assert_eq!(found.map(|b| b.title), Some("OSGi in Depth".to_string()));
    }

    #[tokio::test]
    async fn test_get_book_by_id_falls_back_to_asset_and_caches() {
        let (store, repo) = repo(BookAsset::Bundled);

        let found = repo.get_book_by_id("193518217x").await.expect("lookup");
        assert_eq!(found.as_ref().map(|b| b.title.as_str()), Some("OSGi in Depth"));
        assert_eq!(store.book_count().expect("count"), 1);
        assert!(store.book_by_isbn("193518217X").expect("lookup").is_some());

        assert!(repo.get_book_by_id("0000000000").await.expect("lookup").is_none());
        assert_eq!(store.book_count().expect("count"), 1);
    }
}

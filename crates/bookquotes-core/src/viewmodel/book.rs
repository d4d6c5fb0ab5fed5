use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::models::Book;
use crate::repository::BookRepository;
use crate::state::{StateHolder, ViewState};

/// State for the book list and book detail screens.
pub struct BookViewModel {
    repository: Arc<dyn BookRepository>,
    all_books: StateHolder<Vec<Book>>,
    books_state: StateHolder<ViewState<Vec<Book>>>,
    book_detail: StateHolder<ViewState<Book>>,
    search_query: StateHolder<String>,
}

impl BookViewModel {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self {
            repository,
            all_books: StateHolder::default(),
            books_state: StateHolder::default(),
            book_detail: StateHolder::default(),
            search_query: StateHolder::default(),
        }
    }

    pub async fn load_books(&self) {
        self.books_state.set(ViewState::Loading);
        match self.repository.get_all_books().await {
            Ok(books) => self.publish_books(books),
            Err(e) => {
                error!(error = %format!("{:#}", e), "Failed to load books");
                self.books_state.set(ViewState::from_error(&e));
            }
        }
    }

    pub async fn load_book(&self, isbn: &str) {
        self.book_detail.set(ViewState::Loading);
        match self.repository.get_book_by_id(isbn).await {
            Ok(book) => {
                if book.is_none() {
                    debug!(isbn, "Book not found");
                }
                self.book_detail.set(ViewState::from_option(book));
            }
            Err(e) => {
                error!(isbn, error = %format!("{:#}", e), "Failed to load book");
                self.book_detail.set(ViewState::from_error(&e));
            }
        }
    }

    /// Rebuild the cache from the catalog. Clears the search query on success.
    pub async fn refresh_books(&self) {
        self.books_state.set(ViewState::Loading);
        match self.repository.refresh_books().await {
            Ok(books) => {
                self.publish_books(books);
                self.search_query.set_if_changed(String::new());
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "Failed to refresh books");
                self.books_state.set(ViewState::from_error(&e));
            }
        }
    }

    fn publish_books(&self, books: Vec<Book>) {
        debug!(count = books.len(), "Publishing books");
        self.all_books.set(books.clone());
        self.books_state.set(ViewState::from_list(books));
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.search_query.set_if_changed(query.into());
    }

    pub fn search_query(&self) -> String {
        self.search_query.get()
    }

    // =========================================================================
    // Snapshots and subscriptions
    // =========================================================================

    pub fn all_books(&self) -> Vec<Book> {
        self.all_books.get()
    }

    pub fn books_state(&self) -> ViewState<Vec<Book>> {
        self.books_state.get()
    }

    pub fn book_detail(&self) -> ViewState<Book> {
        self.book_detail.get()
    }

    pub fn subscribe_books_state(&self) -> watch::Receiver<ViewState<Vec<Book>>> {
        self.books_state.subscribe()
    }

    pub fn subscribe_book_detail(&self) -> watch::Receiver<ViewState<Book>> {
        self.book_detail.subscribe()
    }

    /// Books matching the current search query (all books when it is blank).
    pub fn filtered_books(&self) -> Vec<Book> {
        let query = self.search_query.get();
        self.all_books.with(|books| filter_books(books, &query))
    }

    /// The filtered list, emitted now and again whenever the books or the
    /// query change. Ends when the view model is dropped.
    pub fn filtered_updates(&self) -> impl Stream<Item = Vec<Book>> + Send + 'static {
        let books = self.all_books.subscribe();
        let query = self.search_query.subscribe();

        stream::unfold((books, query, true), |(mut books, mut query, first)| async move {
            if !first {
                tokio::select! {
                    changed = books.changed() => changed.ok()?,
                    changed = query.changed() => changed.ok()?,
                }
            }
            let filtered = {
                let books = books.borrow_and_update();
                let query = query.borrow_and_update();
                filter_books(&books, &query)
            };
            Some((filtered, (books, query, false)))
        })
    }
}

// A blank query shows everything; otherwise the query is matched as typed.
fn filter_books(books: &[Book], query: &str) -> Vec<Book> {
    if query.trim().is_empty() {
        return books.to_vec();
    }
    books.iter().filter(|b| b.matches_search(query)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use futures::StreamExt;

    use crate::asset::BookAsset;
    use crate::repository::CachedBookRepository;
    use crate::store::SqliteStore;

    fn view_model() -> BookViewModel {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
        BookViewModel::new(Arc::new(CachedBookRepository::new(store, BookAsset::Bundled)))
    }

    struct BrokenRepository;

    #[async_trait]
    impl BookRepository for BrokenRepository {
        async fn get_all_books(&self) -> Result<Vec<Book>> {
            Err(anyhow!("database is locked").context("Failed to read books"))
        }

        async fn get_book_by_id(&self, _isbn: &str) -> Result<Option<Book>> {
            Err(anyhow!("database is locked"))
        }

        async fn refresh_books(&self) -> Result<Vec<Book>> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_load_books_succeeds_from_bundled_catalog() {
        let vm = view_model();
        assert!(vm.books_state().is_loading());

        vm.load_books().await;

        let state = vm.books_state();
        let books = state.data().expect("books");
        assert_eq!(books.len(), 8);
        assert_eq!(books[0].title, "Unlocking Android");
        assert_eq!(vm.filtered_books().len(), 8);
    }

    #[tokio::test]
    async fn test_search_filters_by_title_and_author() {
        let vm = view_model();
        vm.load_books().await;

        vm.set_search_query("ANDROID");
        let titles: Vec<String> = vm.filtered_books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Unlocking Android", "Android in Action, Second Edition"]);

        vm.set_search_query("robi sen");
        assert_eq!(vm.filtered_books().len(), 2);

        vm.set_search_query("   ");
        assert_eq!(vm.filtered_books().len(), 8);
    }

    #[tokio::test]
    async fn test_search_keeps_surrounding_whitespace() {
        let vm = view_model();
        vm.load_books().await;

        vm.set_search_query("android ");
        let titles: Vec<String> = vm.filtered_books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Android in Action, Second Edition"]);

        vm.set_search_query(" android");
        let titles: Vec<String> = vm.filtered_books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Unlocking Android"]);
    }

    #[tokio::test]
    async fn test_unmatched_search_only_empties_filtered_list() {
        let vm = view_model();
        vm.load_books().await;

        vm.set_search_query("cobol");
        assert!(vm.filtered_books().is_empty());
        assert_eq!(vm.all_books().len(), 8);
        assert_eq!(vm.books_state().data().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn test_refresh_clears_search_query() {
        let vm = view_model();
        vm.load_books().await;
        vm.set_search_query("zend");
        assert_eq!(vm.filtered_books().len(), 1);

        vm.refresh_books().await;

        assert_eq!(vm.search_query(), "");
        assert_eq!(vm.filtered_books().len(), 8);
        assert_eq!(vm.books_state().data().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn test_load_book_detail() {
        let vm = view_model();
        assert!(vm.book_detail().is_loading());

        vm.load_book("193518217x").await;
        assert_eq!(
            vm.book_detail().data().map(|b| b.title.clone()),
            Some("OSGi in Depth".to_string())
        );

        vm.load_book("0000000000").await;
        assert_eq!(vm.book_detail(), ViewState::Empty);
    }

    #[tokio::test]
    async fn test_repository_errors_become_error_states() {
        let vm = BookViewModel::new(Arc::new(BrokenRepository));

        vm.load_books().await;
        assert_eq!(vm.books_state().error(), Some("Failed to read books: database is locked"));
        assert!(vm.all_books().is_empty());

        vm.set_search_query("zend");
        vm.refresh_books().await;
        assert_eq!(vm.books_state().error(), Some("disk full"));
        assert_eq!(vm.search_query(), "zend");

        vm.load_book("1933988320").await;
        assert_eq!(vm.book_detail().error(), Some("database is locked"));
    }

    #[tokio::test]
    async fn test_filtered_updates_follow_books_and_query() {
        let vm = view_model();
        let mut updates = Box::pin(vm.filtered_updates());

        assert_eq!(updates.next().await.map(|b| b.len()), Some(0));

        vm.load_books().await;
        assert_eq!(updates.next().await.map(|b| b.len()), Some(8));

        vm.set_search_query("griffon");
        let filtered = updates.next().await.expect("update");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].isbn, "1935182234");

        drop(vm);
        assert!(updates.next().await.is_none());
    }
}

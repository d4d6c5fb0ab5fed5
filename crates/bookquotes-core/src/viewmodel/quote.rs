use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::models::{normalize_category, Quote, QuoteItem};
use crate::repository::QuoteRepository;
use crate::state::{StateHolder, ViewState};
use crate::utils::eq_ignore_case;

/// State for the quote list and quote detail screens.
///
/// The list itself lives in the repository; this view model keeps the
/// category selection and narrows the repository's quotes to it.
pub struct QuoteViewModel {
    repository: Arc<QuoteRepository>,
    selected_category: StateHolder<Option<String>>,
    quote_detail: StateHolder<ViewState<QuoteItem>>,
}

impl QuoteViewModel {
    pub fn new(repository: Arc<QuoteRepository>) -> Self {
        Self {
            repository,
            selected_category: StateHolder::new(None),
            quote_detail: StateHolder::default(),
        }
    }

    pub fn repository(&self) -> &Arc<QuoteRepository> {
        &self.repository
    }

    /// Selected category, `None` for all quotes.
    pub fn selected_category(&self) -> Option<String> {
        self.selected_category.get()
    }

    /// Switch category and force a reload. Selecting the current category
    /// (including any spelling of "all") does nothing.
    pub async fn select_category(&self, category: Option<&str>) {
        let category = normalize_category(category);
        if !self.selected_category.set_if_changed(category.clone()) {
            debug!(category = ?category, "Category unchanged");
            return;
        }
        self.repository.reset_pagination();
        self.repository.load_quotes(category.as_deref(), true).await;
    }

    pub async fn refresh_quotes(&self) {
        self.repository.reset_pagination();
        let category = self.selected_category.get();
        self.repository.load_quotes(category.as_deref(), true).await;
    }

    pub async fn load_next_page(&self) {
        let category = self.selected_category.get();
        self.repository.load_quotes(category.as_deref(), false).await;
    }

    pub async fn fetch_quote_details(&self, id: i64) {
        self.quote_detail.set(ViewState::Loading);
        match self.repository.get_quote_details(id).await {
            Ok(Some(item)) => self.quote_detail.set(ViewState::Success(item)),
            Ok(None) => {
                warn!("Quote details not found for ID: {}.", id);
                self.quote_detail.set(ViewState::Empty);
            }
            Err(e) => {
                error!(id, error = %format!("{:#}", e), "Failed to fetch quote details");
                self.quote_detail
                    .set(ViewState::Error(format!("Error fetching details: {:#}", e)));
            }
        }
    }

    // =========================================================================
    // Snapshots and subscriptions
    // =========================================================================

    /// The repository's quotes narrowed to the selected category.
    pub fn quotes(&self) -> Vec<QuoteItem> {
        let category = self.selected_category.get();
        self.repository
            .with_quotes(|quotes| filter_quotes(quotes, category.as_deref()))
    }

    /// Quotes for the selected category, emitted now and again whenever the
    /// selection or the repository's list changes.
    pub fn quote_updates(&self) -> impl Stream<Item = Vec<QuoteItem>> + Send + 'static {
        let selection = self.selected_category.subscribe();
        let quotes = self.repository.subscribe_quotes();

        stream::unfold((selection, quotes, true), |(mut selection, mut quotes, first)| async move {
            if !first {
                tokio::select! {
                    changed = selection.changed() => changed.ok()?,
                    changed = quotes.changed() => changed.ok()?,
                }
            }
            let items = {
                let category = selection.borrow_and_update().clone();
                let quotes = quotes.borrow_and_update();
                filter_quotes(&quotes, category.as_deref())
            };
            Some((items, (selection, quotes, false)))
        })
    }

    /// The list screen summarised as a single state.
    ///
    /// Cached quotes win over an error message: the message is still
    /// available through `error_message()`.
    pub fn list_state(&self) -> ViewState<Vec<QuoteItem>> {
        if self.repository.is_loading() {
            return ViewState::Loading;
        }
        let items = self.quotes();
        if !items.is_empty() {
            return ViewState::Success(items);
        }
        match self.repository.error_message() {
            Some(message) => ViewState::Error(message),
            None => ViewState::Empty,
        }
    }

    pub fn quote_detail(&self) -> ViewState<QuoteItem> {
        self.quote_detail.get()
    }

    pub fn subscribe_quote_detail(&self) -> watch::Receiver<ViewState<QuoteItem>> {
        self.quote_detail.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.repository.is_loading()
    }

    pub fn error_message(&self) -> Option<String> {
        self.repository.error_message()
    }
}

fn filter_quotes(quotes: &[Quote], category: Option<&str>) -> Vec<QuoteItem> {
    match category {
        None => quotes.iter().map(QuoteItem::from).collect(),
        Some(c) => quotes
            .iter()
            .filter(|q| eq_ignore_case(&q.category, c))
            .map(QuoteItem::from)
            .collect(),
    }
}

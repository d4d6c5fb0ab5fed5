//! Data models for the book and quote catalogs.
//!
//! - `Book`: a catalog entry decoded from the bundled asset
//! - `Quote`: a quote as returned by the quote API and stored locally
//! - `QuoteItem`: the read-only projection handed to view models
//! - `QuoteApiResponse`: the envelope both quote endpoints return

pub mod book;
pub mod quote;

pub use book::Book;
pub use quote::{Quote, QuoteApiResponse, QuoteItem};

/// Label the category picker uses for the unfiltered list.
pub const ALL_QUOTES: &str = "All Quotes";

/// Categories offered by the quote list screen, in display order.
pub const QUOTE_CATEGORIES: [&str; 5] = [ALL_QUOTES, "Motivation", "Courage", "Nature", "Love"];

/// Returns true when `category` selects every quote rather than one category.
///
/// `None`, a blank string and the `"All Quotes"` label are all treated the same.
pub fn is_all_categories(category: Option<&str>) -> bool {
    match category {
        None => true,
        Some(c) => c.trim().is_empty() || c == ALL_QUOTES,
    }
}

/// Collapse the "all" sentinels to `None`, leaving real categories untouched.
pub fn normalize_category(category: Option<&str>) -> Option<String> {
    if is_all_categories(category) {
        None
    } else {
        category.map(str::to_string)
    }
}

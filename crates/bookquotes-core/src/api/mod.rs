//! REST client for the quote API.
//!
//! The API is served through RapidAPI and authenticates every request with
//! two static headers (`x-rapidapi-key`, `x-rapidapi-host`). It has two
//! endpoints, all quotes and quotes for one category, both returning the
//! same envelope. There is no pagination.

pub mod client;
pub mod error;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::QuoteApiResponse;

pub use client::QuoteApiClient;
pub use error::ApiError;

/// A remote source of quotes.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Every quote the service knows about.
    async fn all_quotes(&self) -> Result<QuoteApiResponse>;

    /// Quotes in a single category.
    async fn quotes_by_category(&self, category: &str) -> Result<QuoteApiResponse>;
}

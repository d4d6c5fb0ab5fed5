use serde::{Deserialize, Serialize};

/// A quote as stored in the local cache.
///
/// `local_id` is the store's surrogate key and never comes from the API;
/// `id` is the identifier the quote API assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(skip)]
    pub local_id: i64,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

/// Response envelope shared by the all-quotes and category endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteApiResponse {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "Quotes")]
    pub quotes: Option<Vec<Quote>>,
}

impl QuoteApiResponse {
    /// The quotes in the response, treating a missing list as empty.
    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes.unwrap_or_default()
    }
}

/// Read-only view of a `Quote` handed to view models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct QuoteItem {
    pub local_id: i64,
    pub id: i64,
    pub category: String,
    pub quote: String,
    pub author: String,
    pub description: String,
    /// Same text as `quote`, kept for the detail screen.
    pub content: String,
}

impl From<&Quote> for QuoteItem {
    fn from(quote: &Quote) -> Self {
        Self {
            local_id: quote.local_id,
            id: quote.id,
            category: quote.category.clone(),
            quote: quote.quote.clone(),
            author: quote.author.clone(),
            description: quote.description.clone(),
            content: quote.quote.clone(),
        }
    }
}

impl From<Quote> for QuoteItem {
    fn from(quote: Quote) -> Self {
        let content = quote.quote.clone();
        Self {
            local_id: quote.local_id,
            id: quote.id,
            category: quote.category,
            quote: quote.quote,
            author: quote.author,
            description: quote.description,
            content,
        }
    }
}

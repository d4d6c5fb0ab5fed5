use serde::{Deserialize, Serialize};

use crate::utils::contains_ignore_case;

/// A book from the bundled catalog asset.
///
/// Every field has a default so sparse asset entries still decode, and
/// unknown keys such as `publishedDate` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Book {
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub isbn: String,
    #[serde(rename = "longDescription")]
    pub long_description: Option<String>,
    #[serde(rename = "pageCount")]
    pub page_count: i32,
    #[serde(rename = "shortDescription")]
    pub short_description: Option<String>,
    pub status: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    pub title: String,
}

impl Book {
    /// Authors joined for display, e.g. "W. Frank Ableson, Charlie Collins".
    pub fn authors_display(&self) -> String {
        self.authors
            .iter()
            .filter(|a| !a.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the title or any author contains `query`, ignoring case.
    pub fn matches_search(&self, query: &str) -> bool {
        contains_ignore_case(&self.title, query)
            || self.authors.iter().any(|a| contains_ignore_case(a, query))
    }

    pub fn isbn_matches(&self, isbn: &str) -> bool {
        self.isbn.eq_ignore_ascii_case(isbn)
    }
}

//! The book catalog asset.
//!
//! Books ship with the application as a JSON array compiled into the binary.
//! A file on disk can replace it (see `Config::books_asset_path`).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::Book;

const BUNDLED_BOOKS: &str = include_str!("../assets/books.json");

/// Where the book catalog is read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BookAsset {
    /// The catalog compiled into the binary.
    #[default]
    Bundled,
    /// A JSON file on disk with the same shape as the bundled catalog.
    File(PathBuf),
}

impl BookAsset {
    /// Use `path` when given, the bundled catalog otherwise.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(BookAsset::File).unwrap_or_default()
    }

    /// Read and decode the whole catalog.
    pub fn load(&self) -> Result<Vec<Book>> {
        match self {
            BookAsset::Bundled => decode_books(BUNDLED_BOOKS).context("Failed to decode bundled books"),
            BookAsset::File(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read book asset: {}", path.display()))?;
                decode_books(&contents)
                    .with_context(|| format!("Failed to decode book asset: {}", path.display()))
            }
        }
    }

    /// `load` on the blocking pool.
    pub async fn load_async(&self) -> Result<Vec<Book>> {
        let asset = self.clone();
        tokio::task::spawn_blocking(move || asset.load())
            .await
            .context("Book asset task did not complete")?
    }
}

/// Decode a JSON array of books. Unknown keys are ignored.
pub fn decode_books(json: &str) -> Result<Vec<Book>> {
    Ok(serde_json::from_str(json)?)
}

//! Repositories sitting between the view models and the data sources.
//!
//! - `BookRepository` / `CachedBookRepository`: cache-first reads of the book
//!   catalog with the bundled asset as the source of truth
//! - `QuoteRepository`: read-through cache for quotes with network refresh,
//!   exposing its results as observable state

pub mod book;
pub mod quote;

pub use book::{BookRepository, CachedBookRepository};
pub use quote::QuoteRepository;

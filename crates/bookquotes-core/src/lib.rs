//! Book & Quotes Hub core.
//!
//! Everything behind the book and quote screens: the bundled book catalog,
//! the RapidAPI quote client, the SQLite offline cache, the repositories that
//! reconcile them, and the view models the UI observes. The UI itself lives
//! in the host application.

pub mod api;
pub mod app;
pub mod asset;
pub mod config;
pub mod credentials;
pub mod models;
pub mod net;
pub mod repository;
pub mod state;
pub mod store;
pub mod utils;
pub mod viewmodel;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use api::{ApiError, QuoteApiClient, QuoteSource};
pub use app::{App, CacheAges};
pub use asset::BookAsset;
pub use config::Config;
pub use credentials::ApiKeyStore;
pub use models::{Book, Quote, QuoteItem, ALL_QUOTES, QUOTE_CATEGORIES};
pub use net::{Connectivity, NetworkMonitor};
pub use repository::{BookRepository, CachedBookRepository, QuoteRepository};
pub use state::{StateHolder, TaskScope, ViewState};
pub use store::{BookStore, QuoteStore, SqliteStore};
pub use viewmodel::{BookViewModel, QuoteViewModel};

/// Install a stderr tracing subscriber for hosts that have none.
///
/// Use the RUST_LOG env var to control the level (e.g. RUST_LOG=debug);
/// defaults to `warn`. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

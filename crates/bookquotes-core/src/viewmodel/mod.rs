//! Screen-facing view models.
//!
//! View models own the per-screen state (`ViewState`s, search query,
//! selected category) and turn repository results into it. Hosts either
//! read snapshots or subscribe to the update streams.

pub mod book;
pub mod quote;

pub use book::BookViewModel;
pub use quote::QuoteViewModel;

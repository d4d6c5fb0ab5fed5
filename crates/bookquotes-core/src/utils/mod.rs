//! Utility functions for string matching and display formatting.

pub mod format;

pub use format::{contains_ignore_case, eq_ignore_case, format_age_minutes};

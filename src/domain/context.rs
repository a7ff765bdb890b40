//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error converts
//! into [`DecomposerError`], keeping the library on its own error type instead
//! of `anyhow`.
//!
//! # Examples
//!
//! ```rust
//! use nocturne_decomposer::domain::Result;
//! use nocturne_decomposer::domain::context::ResultExt;
//!
//! fn read_payload(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::DecomposerError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Adds eagerly-evaluated context to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Adds context computed only when an error occurred
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<DecomposerError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

// Wrapped storage errors surface as backfill errors; the store-level failure
// stays distinguishable from per-record ones.
fn wrap(err: DecomposerError, context: impl std::fmt::Display) -> DecomposerError {
    match err {
        DecomposerError::Storage(inner) => DecomposerError::Backfill(format!("{context}: {inner}")),
        other => DecomposerError::Other(format!("{context}: {other}")),
    }
}

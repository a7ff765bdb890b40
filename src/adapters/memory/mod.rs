//! In-memory storage adapters
//!
//! Thread-safe implementations of every storage trait, backed by `RwLock`ed
//! maps. Used for dry runs and tests.
//!
//! ## Limitations
//!
//! - **No durability**: all state is lost when the process exits
//! - **Single-process only**: state is not shared across process boundaries

pub mod checkpoint;
pub mod historical;
pub mod repository;
pub mod state_span;

pub use checkpoint::InMemoryCheckpointStorage;
pub use historical::InMemoryHistoricalStore;
pub use repository::{InMemoryRepositories, InMemoryRepository};
pub use state_span::InMemoryStateSpanService;

use crate::domain::errors::{DecomposerError, StorageError};
use std::sync::PoisonError;

/// Converts a lock poison error to a storage error.
pub(crate) fn poison_err<T>(_: PoisonError<T>) -> DecomposerError {
    StorageError::QueryFailed("lock poisoned".to_string()).into()
}

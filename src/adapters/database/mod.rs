//! Storage abstraction layer
//!
//! Trait seams between the decomposition core and storage, plus construction
//! of the configured backend.

pub mod factory;
pub mod traits;

pub use factory::{create_backends, create_postgres_adapter, Backends};
pub use traits::{CheckpointStorage, HistoricalStore, RecordRepository, StateSpanService};

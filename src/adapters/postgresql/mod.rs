//! PostgreSQL storage
//!
//! Target records live in one JSONB table per kind with a `UNIQUE (legacy_id)`
//! constraint; the historical dataset is read from the configured legacy
//! tables.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{
    PostgreSQLAdapter, PostgreSQLCheckpointStorage, PostgreSQLHistoricalStore,
    PostgreSQLRecordRepository, PostgreSQLStateSpanService,
};
pub use client::PostgreSQLClient;
pub use models::legacy_row;

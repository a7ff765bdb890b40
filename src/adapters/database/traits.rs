//! Storage abstraction traits
//!
//! The decomposition core only sees storage through these traits. The
//! PostgreSQL adapter implements them for production runs and the in-memory
//! adapter for dry runs and tests.

use crate::core::backfill::cursor::{BackfillCheckpoint, BackfillPass, Cursor, HistoricalRow};
use crate::domain::ids::{LegacyId, RecordId};
use crate::domain::records::TargetRecord;
use crate::domain::state_span::StateSpan;
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use async_trait::async_trait;

/// Per-kind repository of target records
///
/// Rows are addressed by their generated [`RecordId`] and looked up by the
/// legacy id they were decomposed from.
#[async_trait]
pub trait RecordRepository<T: TargetRecord>: Send + Sync {
    /// Find the row decomposed from `legacy_id`
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` when no row carries this legacy id.
    async fn get_by_legacy_id(&self, legacy_id: &LegacyId) -> Result<Option<T>>;

    /// Insert a new row and return it as stored
    async fn create(&self, record: &T) -> Result<T>;

    /// Replace the row identified by `id` and return it as stored
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RecordNotFound` if no row has this id.
    async fn update(&self, id: RecordId, record: &T) -> Result<T>;
}

/// Interval model collaborator
///
/// Owns merging and splitting of overlapping spans; the decomposer only hands
/// it finished spans or raw temp basal treatments.
#[async_trait]
pub trait StateSpanService: Send + Sync {
    /// Build and persist the basal delivery span for a temp basal treatment
    async fn create_basal_delivery_from_treatment(&self, treatment: &Treatment)
        -> Result<StateSpan>;

    /// Persist a span, idempotently on `(category, original_id)`
    ///
    /// Returns the stored span. When a span with the same key already exists
    /// the returned span carries the existing id.
    async fn upsert_state_span(&self, span: StateSpan) -> Result<StateSpan>;
}

/// Ordered, paginated read access to a historical dataset
#[async_trait]
pub trait HistoricalStore<R>: Send + Sync {
    /// Total number of rows
    async fn count(&self) -> Result<u64>;

    /// Up to `limit` rows strictly after `cursor`, ordered by `(mills, id)`
    ///
    /// `None` starts from the beginning. A row whose document fails to decode
    /// is returned with its key and the decode error; only failures of the
    /// read itself make the whole call fail.
    async fn fetch_after(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<HistoricalRow<R>>>;
}

/// Persistence for backfill checkpoints
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Load the checkpoint of a pass
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the pass has never been checkpointed.
    async fn load_checkpoint(&self, pass: BackfillPass) -> Result<Option<BackfillCheckpoint>>;

    /// Save (insert or replace) the checkpoint of its pass
    async fn save_checkpoint(&self, checkpoint: &BackfillCheckpoint) -> Result<()>;

    /// All stored checkpoints
    async fn get_all_checkpoints(&self) -> Result<Vec<BackfillCheckpoint>>;
}

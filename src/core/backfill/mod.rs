//! Backfill of the historical dataset
//!
//! - [`driver`] - the paginated two-pass run
//! - [`cursor`] - `(mills, id)` cursor and checkpoints
//! - [`summary`] - run-level counters

pub mod cursor;
pub mod driver;
pub mod summary;

pub use cursor::{
    BackfillCheckpoint, BackfillCheckpointBuilder, BackfillPass, CheckpointStatus, Cursor,
    CursorKey, HistoricalRow, LegacyDocument,
};
pub use driver::{BackfillDriver, BackfillOptions};
pub use summary::{BackfillError, BackfillResult};

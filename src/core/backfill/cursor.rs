//! Pagination cursor and checkpoint model
//!
//! Historical rows are scanned in `(mills, id)` order. `mills` alone is not
//! unique, so the cursor always carries both halves of the key.

use crate::domain::entry::Entry;
use crate::domain::errors::{DecomposerError, StorageError};
use crate::domain::result;
use crate::domain::treatment::Treatment;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Last-read position of a paginated scan
///
/// Orders by `mills`, then `id`, the same way the historical store does.
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::core::backfill::Cursor;
///
/// let a = Cursor::new(1000, "a");
/// let b = Cursor::new(1000, "b");
/// let c = Cursor::new(1001, "a");
/// assert!(a < b && b < c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub mills: i64,
    pub id: String,
}

impl Cursor {
    pub fn new(mills: i64, id: impl Into<String>) -> Self {
        Self {
            mills,
            id: id.into(),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.mills, self.id)
    }
}

/// Rows that can be paginated by `(mills, id)`
pub trait CursorKey {
    fn cursor(&self) -> Cursor;
}

// Rows without an id sort first within their millisecond, matching the
// store's `COALESCE(id, '')` ordering.
impl CursorKey for Treatment {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.mills, self.id.clone().unwrap_or_default())
    }
}

impl CursorKey for Entry {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.mills, self.id.clone().unwrap_or_default())
    }
}

/// A legacy document stored as `(id, mills, data)`
///
/// The key columns win over whatever the JSON document carries, so the
/// decoded record always agrees with the cursor used to page it.
pub trait LegacyDocument: CursorKey + DeserializeOwned + Send + Sync + 'static {
    fn set_key(&mut self, id: String, mills: i64);

    /// Decode the `data` column of one row
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DeserializationFailed` if the document does not
    /// fit the record shape.
    fn from_document(id: String, mills: i64, data: Value) -> result::Result<Self> {
        let mut doc: Self = serde_json::from_value(data).map_err(|e| {
            StorageError::DeserializationFailed(format!("legacy document {id}: {e}"))
        })?;
        doc.set_key(id, mills);
        Ok(doc)
    }
}

impl LegacyDocument for Treatment {
    fn set_key(&mut self, id: String, mills: i64) {
        self.id = Some(id);
        self.mills = mills;
    }
}

impl LegacyDocument for Entry {
    fn set_key(&mut self, id: String, mills: i64) {
        self.id = Some(id);
        self.mills = mills;
    }
}

/// One row of a historical page
///
/// The key is read even when the document is not decodable, so a bad row
/// can be counted as failed and paged past.
#[derive(Debug)]
pub struct HistoricalRow<R> {
    pub cursor: Cursor,
    pub record: result::Result<R>,
}

impl<R: CursorKey> HistoricalRow<R> {
    pub fn decoded(record: R) -> Self {
        Self {
            cursor: record.cursor(),
            record: Ok(record),
        }
    }
}

impl<R> HistoricalRow<R> {
    /// Row whose document failed to decode
    pub fn undecodable(cursor: Cursor, error: impl Into<DecomposerError>) -> Self {
        Self {
            cursor,
            record: Err(error.into()),
        }
    }
}

/// Sub-pass of a backfill run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillPass {
    Entries,
    Treatments,
}

impl BackfillPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::Treatments => "treatments",
        }
    }
}

impl fmt::Display for BackfillPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackfillPass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entries" => Ok(Self::Entries),
            "treatments" => Ok(Self::Treatments),
            other => Err(format!("Unknown backfill pass: {other}")),
        }
    }
}

/// Status of a checkpointed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Interrupted,
    Failed,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for CheckpointStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "interrupted" => Ok(Self::Interrupted),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown checkpoint status: {other}")),
        }
    }
}

/// Saved progress of one backfill pass
///
/// Written after every batch so an interrupted run can resume from `cursor`
/// instead of rescanning from the beginning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillCheckpoint {
    pub pass: BackfillPass,

    /// Key of the last row read; `None` before the first batch
    pub cursor: Option<Cursor>,

    /// Rows read so far in this pass, across resumed runs
    pub records_scanned: u64,

    pub status: CheckpointStatus,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,
}

impl BackfillCheckpoint {
    /// Whether a resumed run should pick up from this checkpoint
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            CheckpointStatus::InProgress | CheckpointStatus::Interrupted | CheckpointStatus::Failed
        )
    }

    pub fn is_completed(&self) -> bool {
        self.status == CheckpointStatus::Completed
    }

    /// Mark the pass as started
    pub fn mark_started(&mut self) {
        self.started_at = Utc::now();
        self.status = CheckpointStatus::InProgress;
        self.completed_at = None;
    }

    /// Record a processed batch ending at `cursor`
    pub fn advance(&mut self, cursor: Cursor, rows: u64) {
        self.cursor = Some(cursor);
        self.records_scanned += rows;
    }

    pub fn mark_completed(&mut self) {
        self.completed_at = Some(Utc::now());
        self.status = CheckpointStatus::Completed;
    }

    /// Mark the pass as stopped by cancellation
    pub fn mark_interrupted(&mut self) {
        self.status = CheckpointStatus::Interrupted;
    }

    pub fn mark_failed(&mut self) {
        self.completed_at = Some(Utc::now());
        self.status = CheckpointStatus::Failed;
    }

    /// Duration of the pass if it completed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Builder for [`BackfillCheckpoint`]
pub struct BackfillCheckpointBuilder {
    pass: BackfillPass,
    cursor: Option<Cursor>,
    records_scanned: u64,
    status: CheckpointStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl BackfillCheckpointBuilder {
    pub fn new(pass: BackfillPass) -> Self {
        Self {
            pass,
            cursor: None,
            records_scanned: 0,
            status: CheckpointStatus::NotStarted,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn records_scanned(mut self, count: u64) -> Self {
        self.records_scanned = count;
        self
    }

    pub fn status(mut self, status: CheckpointStatus) -> Self {
        self.status = status;
        self
    }

    pub fn started_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.started_at = Some(timestamp);
        self
    }

    pub fn completed_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.completed_at = Some(timestamp);
        self
    }

    pub fn build(self) -> BackfillCheckpoint {
        BackfillCheckpoint {
            pass: self.pass,
            cursor: self.cursor,
            records_scanned: self.records_scanned,
            status: self.status,
            started_at: self.started_at.unwrap_or_else(Utc::now),
            completed_at: self.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_key_overrides_document() {
        let treatment = Treatment::from_document(
            "outer".to_string(),
            99,
            json!({"_id": "inner", "mills": 1, "eventType": "Note"}),
        )
        .unwrap();
        assert_eq!(treatment.id.as_deref(), Some("outer"));
        assert_eq!(treatment.mills, 99);
    }

    #[test]
    fn test_undecodable_document_names_the_row() {
        let err = Treatment::from_document(
            "t1".to_string(),
            5,
            json!({"eventType": "Correction Bolus", "insulin": "1.5"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("legacy document t1"));
    }

    #[test]
    fn test_historical_row_keys() {
        let decoded = HistoricalRow::decoded(Entry {
            id: Some("e1".to_string()),
            mills: 7,
            ..Default::default()
        });
        assert_eq!(decoded.cursor, Cursor::new(7, "e1"));
        assert!(decoded.record.is_ok());

        let bad: HistoricalRow<Entry> = HistoricalRow::undecodable(
            Cursor::new(8, "e2"),
            StorageError::DeserializationFailed("bad".to_string()),
        );
        assert!(bad.record.is_err());
    }

    #[test]
    fn test_cursor_orders_by_mills_then_id() {
        let mut cursors = vec![
            Cursor::new(2, "a"),
            Cursor::new(1, "z"),
            Cursor::new(1, "b"),
            Cursor::new(1, ""),
        ];
        cursors.sort();
        assert_eq!(
            cursors,
            vec![
                Cursor::new(1, ""),
                Cursor::new(1, "b"),
                Cursor::new(1, "z"),
                Cursor::new(2, "a"),
            ]
        );
    }

    #[test]
    fn test_treatment_cursor() {
        let t = Treatment::new(Some("abc"), 42, None);
        assert_eq!(t.cursor(), Cursor::new(42, "abc"));

        let anonymous = Treatment::new(None, 42, None);
        assert_eq!(anonymous.cursor(), Cursor::new(42, ""));
    }

    #[test]
    fn test_checkpoint_builder_defaults() {
        let checkpoint = BackfillCheckpointBuilder::new(BackfillPass::Treatments).build();
        assert_eq!(checkpoint.pass, BackfillPass::Treatments);
        assert_eq!(checkpoint.status, CheckpointStatus::NotStarted);
        assert!(checkpoint.cursor.is_none());
        assert!(!checkpoint.is_resumable());
    }

    #[test]
    fn test_checkpoint_lifecycle() {
        let mut checkpoint = BackfillCheckpointBuilder::new(BackfillPass::Entries).build();
        checkpoint.mark_started();
        assert!(checkpoint.is_resumable());

        checkpoint.advance(Cursor::new(10, "x"), 1000);
        checkpoint.advance(Cursor::new(20, "y"), 500);
        assert_eq!(checkpoint.records_scanned, 1500);
        assert_eq!(checkpoint.cursor, Some(Cursor::new(20, "y")));

        checkpoint.mark_interrupted();
        assert!(checkpoint.is_resumable());
        assert!(checkpoint.completed_at.is_none());

        checkpoint.mark_completed();
        assert!(checkpoint.is_completed());
        assert!(!checkpoint.is_resumable());
        assert!(checkpoint.duration().is_some());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            CheckpointStatus::NotStarted,
            CheckpointStatus::InProgress,
            CheckpointStatus::Completed,
            CheckpointStatus::Interrupted,
            CheckpointStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CheckpointStatus>().unwrap(), status);
        }
        assert_eq!("entries".parse::<BackfillPass>().unwrap(), BackfillPass::Entries);
    }
}

//! PostgreSQL row models
//!
//! Conversions between domain types and the rows of
//! `migrations/001_initial_schema.sql`.

use crate::core::backfill::cursor::{BackfillCheckpoint, Cursor, HistoricalRow, LegacyDocument};
use crate::domain::errors::{DecomposerError, StorageError};
use crate::domain::ids::RecordId;
use crate::domain::records::TargetRecord;
use crate::domain::state_span::StateSpan;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

fn decode_err(what: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::DeserializationFailed(format!("{what}: {e}"))
}

/// Row of a target record table
#[derive(Debug, Clone)]
pub struct PostgreSQLRecord {
    pub id: Uuid,
    pub legacy_id: Option<String>,
    pub mills: i64,
    pub correlation_id: Uuid,
    pub data: Value,
}

impl PostgreSQLRecord {
    /// Build a row from a record, storing it under `id`
    pub fn from_domain<T: TargetRecord>(record: &T, id: RecordId) -> Result<Self> {
        let mut record = record.clone();
        record.header_mut().id = id;

        let header = record.header();
        Ok(Self {
            id: id.as_uuid(),
            legacy_id: header.legacy_id.as_ref().map(|l| l.as_str().to_string()),
            mills: header.mills,
            correlation_id: header.correlation_id.as_uuid(),
            data: serde_json::to_value(&record)?,
        })
    }

    /// Decode the `data` column of a row
    pub fn decode<T: TargetRecord>(row: &Row) -> Result<T> {
        let data: Value = row.try_get("data")?;
        serde_json::from_value(data)
            .map_err(|e| decode_err(T::KIND.as_str(), e).into())
    }
}

/// Row of `state_spans`
#[derive(Debug, Clone)]
pub struct PostgreSQLStateSpan {
    pub id: Uuid,
    pub category: String,
    pub state: String,
    pub start_mills: i64,
    pub end_mills: Option<i64>,
    pub source: String,
    pub original_id: Option<String>,
    pub metadata: Value,
}

impl PostgreSQLStateSpan {
    pub fn from_domain(span: &StateSpan) -> Result<Self> {
        Ok(Self {
            id: span.id.as_uuid(),
            category: span.category.as_str().to_string(),
            state: span.state.clone(),
            start_mills: span.start_mills,
            end_mills: span.end_mills,
            source: span.source.clone(),
            original_id: span.original_id.clone(),
            metadata: serde_json::to_value(&span.metadata)?,
        })
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            category: row.try_get("category")?,
            state: row.try_get("state")?,
            start_mills: row.try_get("start_mills")?,
            end_mills: row.try_get("end_mills")?,
            source: row.try_get("source")?,
            original_id: row.try_get("original_id")?,
            metadata: row.try_get("metadata")?,
        })
    }

    pub fn to_domain(self) -> Result<StateSpan> {
        Ok(StateSpan {
            id: RecordId::from_uuid(self.id),
            category: self
                .category
                .parse()
                .map_err(|e: String| decode_err("state span category", e))?,
            state: self.state,
            start_mills: self.start_mills,
            end_mills: self.end_mills,
            source: self.source,
            original_id: self.original_id,
            metadata: serde_json::from_value(self.metadata)
                .map_err(|e| decode_err("state span metadata", e))?,
        })
    }
}

/// Row of `backfill_checkpoints`
#[derive(Debug, Clone)]
pub struct PostgreSQLCheckpoint {
    pub pass: String,
    pub cursor_mills: Option<i64>,
    pub cursor_id: Option<String>,
    pub records_scanned: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PostgreSQLCheckpoint {
    pub fn from_domain(checkpoint: &BackfillCheckpoint) -> Self {
        Self {
            pass: checkpoint.pass.as_str().to_string(),
            cursor_mills: checkpoint.cursor.as_ref().map(|c| c.mills),
            cursor_id: checkpoint.cursor.as_ref().map(|c| c.id.clone()),
            records_scanned: i64::try_from(checkpoint.records_scanned).unwrap_or(i64::MAX),
            status: checkpoint.status.as_str().to_string(),
            started_at: checkpoint.started_at,
            completed_at: checkpoint.completed_at,
        }
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            pass: row.try_get("pass")?,
            cursor_mills: row.try_get("cursor_mills")?,
            cursor_id: row.try_get("cursor_id")?,
            records_scanned: row.try_get("records_scanned")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    pub fn to_domain(self) -> Result<BackfillCheckpoint> {
        let cursor = match (self.cursor_mills, self.cursor_id) {
            (Some(mills), Some(id)) => Some(Cursor::new(mills, id)),
            _ => None,
        };

        Ok(BackfillCheckpoint {
            pass: self
                .pass
                .parse()
                .map_err(|e: String| decode_err("checkpoint pass", e))?,
            cursor,
            records_scanned: u64::try_from(self.records_scanned).unwrap_or(0),
            status: self
                .status
                .parse()
                .map_err(|e: String| decode_err("checkpoint status", e))?,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// Key and decoded document of a legacy `(id, mills, data)` row
///
/// Unreadable key columns fail the call; a document that does not decode is
/// kept as a per-row error so the page can still be paged past.
pub fn legacy_row<R: LegacyDocument>(row: &Row) -> Result<HistoricalRow<R>> {
    let id: String = row.try_get("id")?;
    let mills: i64 = row.try_get("mills")?;
    let cursor = Cursor::new(mills, id.clone());

    let record = row
        .try_get::<_, Value>("data")
        .map_err(DecomposerError::from)
        .and_then(|data| R::from_document(id, mills, data));
    Ok(HistoricalRow { cursor, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backfill::cursor::{BackfillCheckpointBuilder, BackfillPass, CheckpointStatus};
    use crate::domain::ids::CorrelationId;
    use crate::domain::records::{Note, RecordHeader};
    use crate::domain::state_span::StateSpanCategory;

    #[test]
    fn test_record_row_uses_given_id() {
        let note = Note {
            header: RecordHeader::new(Some("abc"), 42, CorrelationId::new()),
            text: Some("hello".to_string()),
            event_type: Some("Note".to_string()),
            is_announcement: false,
        };
        let id = RecordId::new();

        let row = PostgreSQLRecord::from_domain(&note, id).unwrap();
        assert_eq!(row.id, id.as_uuid());
        assert_eq!(row.legacy_id.as_deref(), Some("abc"));
        assert_eq!(row.mills, 42);
        assert_eq!(row.data["id"], serde_json::json!(id.to_string()));
    }

    #[test]
    fn test_checkpoint_row_conversion() {
        let checkpoint = BackfillCheckpointBuilder::new(BackfillPass::Entries)
            .cursor(Cursor::new(10, "e10"))
            .records_scanned(500)
            .status(CheckpointStatus::Interrupted)
            .build();

        let restored = PostgreSQLCheckpoint::from_domain(&checkpoint)
            .to_domain()
            .unwrap();
        assert_eq!(restored, checkpoint);
    }

    #[test]
    fn test_checkpoint_without_cursor() {
        let row = PostgreSQLCheckpoint::from_domain(
            &BackfillCheckpointBuilder::new(BackfillPass::Treatments).build(),
        );
        assert!(row.cursor_mills.is_none());
        assert!(row.to_domain().unwrap().cursor.is_none());
    }

    #[test]
    fn test_state_span_bad_category() {
        let mut row = PostgreSQLStateSpan::from_domain(&StateSpan::new(
            StateSpanCategory::Override,
            "Custom",
            1,
            "loop",
        ))
        .unwrap();
        row.category = "Weather".to_string();
        assert!(row.to_domain().is_err());
    }
}

//! PostgreSQL implementations of the storage traits

use crate::adapters::database::traits::{
    CheckpointStorage, HistoricalStore, RecordRepository, StateSpanService,
};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    legacy_row, PostgreSQLCheckpoint, PostgreSQLRecord, PostgreSQLStateSpan,
};
use crate::core::backfill::cursor::{
    BackfillCheckpoint, BackfillPass, Cursor, HistoricalRow, LegacyDocument,
};
use crate::core::decompose::state_span::build_basal_span;
use crate::core::decompose::Repositories;
use crate::domain::entry::Entry;
use crate::domain::errors::StorageError;
use crate::domain::ids::{LegacyId, RecordId};
use crate::domain::records::TargetRecord;
use crate::domain::state_span::StateSpan;
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::error::SqlState;

/// Entry point to the PostgreSQL backend
///
/// Hands out trait objects that all share one connection pool.
#[derive(Clone)]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    /// One repository per target table
    pub fn repositories(&self) -> Repositories {
        Repositories {
            boluses: self.repository(),
            carb_intakes: self.repository(),
            bg_checks: self.repository(),
            notes: self.repository(),
            device_events: self.repository(),
            bolus_calculations: self.repository(),
            sensor_glucose: self.repository(),
            meter_glucose: self.repository(),
            calibrations: self.repository(),
        }
    }

    fn repository<T: TargetRecord>(&self) -> Arc<dyn RecordRepository<T>> {
        Arc::new(PostgreSQLRecordRepository::<T>::new(self.client.clone()))
    }

    pub fn state_spans(&self) -> Arc<dyn StateSpanService> {
        Arc::new(PostgreSQLStateSpanService {
            client: self.client.clone(),
        })
    }

    pub fn treatments(&self) -> Arc<dyn HistoricalStore<Treatment>> {
        let table = self.client.config().treatments_table.clone();
        Arc::new(PostgreSQLHistoricalStore::<Treatment>::new(
            self.client.clone(),
            table,
        ))
    }

    pub fn entries(&self) -> Arc<dyn HistoricalStore<Entry>> {
        let table = self.client.config().entries_table.clone();
        Arc::new(PostgreSQLHistoricalStore::<Entry>::new(
            self.client.clone(),
            table,
        ))
    }

    pub fn checkpoints(&self) -> Arc<dyn CheckpointStorage> {
        Arc::new(PostgreSQLCheckpointStorage {
            client: self.client.clone(),
        })
    }
}

/// JSONB-backed repository for one target record kind
pub struct PostgreSQLRecordRepository<T> {
    client: Arc<PostgreSQLClient>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: TargetRecord> PostgreSQLRecordRepository<T> {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn table() -> &'static str {
        T::KIND.table_name()
    }
}

#[async_trait]
impl<T: TargetRecord> RecordRepository<T> for PostgreSQLRecordRepository<T> {
    async fn get_by_legacy_id(&self, legacy_id: &LegacyId) -> Result<Option<T>> {
        let query = format!("SELECT data FROM {} WHERE legacy_id = $1", Self::table());
        let row = self.client.query_opt(&query, &[&legacy_id.as_str()]).await?;
        row.as_ref().map(PostgreSQLRecord::decode::<T>).transpose()
    }

    async fn create(&self, record: &T) -> Result<T> {
        let row = PostgreSQLRecord::from_domain(record, record.header().id)?;
        let query = format!(
            "INSERT INTO {} (id, legacy_id, mills, correlation_id, data) \
             VALUES ($1, $2, $3, $4, $5) RETURNING data",
            Self::table()
        );

        let conn = self.client.get_connection().await?;
        let inserted = conn
            .query_one(
                &query,
                &[
                    &row.id,
                    &row.legacy_id,
                    &row.mills,
                    &row.correlation_id,
                    &row.data,
                ],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    StorageError::Conflict {
                        kind: T::KIND.to_string(),
                        legacy_id: row.legacy_id.clone().unwrap_or_default(),
                    }
                } else {
                    StorageError::InsertFailed {
                        kind: T::KIND.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        PostgreSQLRecord::decode(&inserted)
    }

    async fn update(&self, id: RecordId, record: &T) -> Result<T> {
        let row = PostgreSQLRecord::from_domain(record, id)?;
        let query = format!(
            "UPDATE {} SET legacy_id = $2, mills = $3, correlation_id = $4, data = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING data",
            Self::table()
        );

        let conn = self.client.get_connection().await?;
        let updated = conn
            .query_opt(
                &query,
                &[
                    &row.id,
                    &row.legacy_id,
                    &row.mills,
                    &row.correlation_id,
                    &row.data,
                ],
            )
            .await
            .map_err(|e| StorageError::UpdateFailed {
                kind: T::KIND.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| StorageError::RecordNotFound {
                kind: T::KIND.to_string(),
                id: id.to_string(),
            })?;

        PostgreSQLRecord::decode(&updated)
    }
}

/// State spans in the `state_spans` table
pub struct PostgreSQLStateSpanService {
    client: Arc<PostgreSQLClient>,
}

const UPSERT_SPAN_SQL: &str = r#"
    INSERT INTO state_spans (
        id, category, state, start_mills, end_mills, source, original_id, metadata
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (category, original_id) DO UPDATE SET
        state = EXCLUDED.state,
        start_mills = EXCLUDED.start_mills,
        end_mills = EXCLUDED.end_mills,
        source = EXCLUDED.source,
        metadata = EXCLUDED.metadata,
        updated_at = NOW()
    RETURNING id, category, state, start_mills, end_mills, source, original_id, metadata
"#;

#[async_trait]
impl StateSpanService for PostgreSQLStateSpanService {
    async fn create_basal_delivery_from_treatment(
        &self,
        treatment: &Treatment,
    ) -> Result<StateSpan> {
        self.upsert_state_span(build_basal_span(treatment)).await
    }

    async fn upsert_state_span(&self, span: StateSpan) -> Result<StateSpan> {
        let row = PostgreSQLStateSpan::from_domain(&span)?;
        let conn = self.client.get_connection().await?;

        let stored = conn
            .query_one(
                UPSERT_SPAN_SQL,
                &[
                    &row.id,
                    &row.category,
                    &row.state,
                    &row.start_mills,
                    &row.end_mills,
                    &row.source,
                    &row.original_id,
                    &row.metadata,
                ],
            )
            .await
            .map_err(|e| StorageError::InsertFailed {
                kind: "state_span".to_string(),
                message: e.to_string(),
            })?;

        let stored = PostgreSQLStateSpan::from_row(&stored)?.to_domain()?;
        tracing::debug!(
            span_id = %stored.id,
            category = %stored.category,
            original_id = ?stored.original_id,
            "State span upserted"
        );
        Ok(stored)
    }
}

/// Legacy documents read in `(mills, id)` order
///
/// Ids compare with the `"C"` collation so the database order matches the
/// byte order of [`Cursor`].
pub struct PostgreSQLHistoricalStore<R> {
    client: Arc<PostgreSQLClient>,
    table: String,
    _row: PhantomData<fn() -> R>,
}

impl<R: LegacyDocument> PostgreSQLHistoricalStore<R> {
    /// `table` must already be a validated identifier
    pub fn new(client: Arc<PostgreSQLClient>, table: String) -> Self {
        Self {
            client,
            table,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<R: LegacyDocument> HistoricalStore<R> for PostgreSQLHistoricalStore<R> {
    async fn count(&self) -> Result<u64> {
        let query = format!("SELECT COUNT(*) AS total FROM {}", self.table);
        let rows = self.client.query(&query, &[]).await?;
        let total: i64 = match rows.first() {
            Some(row) => row.try_get("total")?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch_after(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<HistoricalRow<R>>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match cursor {
            None => {
                let query = format!(
                    "SELECT id, mills, data FROM {} \
                     ORDER BY mills, id COLLATE \"C\" LIMIT $1",
                    self.table
                );
                self.client.query(&query, &[&limit]).await?
            }
            Some(cursor) => {
                let query = format!(
                    "SELECT id, mills, data FROM {} \
                     WHERE mills > $1 OR (mills = $1 AND id COLLATE \"C\" > $2) \
                     ORDER BY mills, id COLLATE \"C\" LIMIT $3",
                    self.table
                );
                self.client
                    .query(&query, &[&cursor.mills, &cursor.id, &limit])
                    .await?
            }
        };

        rows.iter().map(legacy_row::<R>).collect()
    }
}

/// Checkpoints in the `backfill_checkpoints` table
pub struct PostgreSQLCheckpointStorage {
    client: Arc<PostgreSQLClient>,
}

const CHECKPOINT_COLUMNS: &str =
    "pass, cursor_mills, cursor_id, records_scanned, status, started_at, completed_at";

#[async_trait]
impl CheckpointStorage for PostgreSQLCheckpointStorage {
    async fn load_checkpoint(&self, pass: BackfillPass) -> Result<Option<BackfillCheckpoint>> {
        let query =
            format!("SELECT {CHECKPOINT_COLUMNS} FROM backfill_checkpoints WHERE pass = $1");
        match self.client.query_opt(&query, &[&pass.as_str()]).await? {
            Some(row) => Ok(Some(PostgreSQLCheckpoint::from_row(&row)?.to_domain()?)),
            None => Ok(None),
        }
    }

    async fn save_checkpoint(&self, checkpoint: &BackfillCheckpoint) -> Result<()> {
        let row = PostgreSQLCheckpoint::from_domain(checkpoint);
        let query = r#"
            INSERT INTO backfill_checkpoints (
                pass, cursor_mills, cursor_id, records_scanned, status, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (pass) DO UPDATE SET
                cursor_mills = EXCLUDED.cursor_mills,
                cursor_id = EXCLUDED.cursor_id,
                records_scanned = EXCLUDED.records_scanned,
                status = EXCLUDED.status,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = NOW()
        "#;

        self.client
            .execute(
                query,
                &[
                    &row.pass,
                    &row.cursor_mills,
                    &row.cursor_id,
                    &row.records_scanned,
                    &row.status,
                    &row.started_at,
                    &row.completed_at,
                ],
            )
            .await?;

        tracing::debug!(
            pass = %checkpoint.pass,
            status = checkpoint.status.as_str(),
            records_scanned = checkpoint.records_scanned,
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn get_all_checkpoints(&self) -> Result<Vec<BackfillCheckpoint>> {
        let query = format!("SELECT {CHECKPOINT_COLUMNS} FROM backfill_checkpoints ORDER BY pass");
        let rows = self.client.query(&query, &[]).await?;
        rows.iter()
            .map(|row| PostgreSQLCheckpoint::from_row(row)?.to_domain())
            .collect()
    }
}

//! Resumable, cursor-paginated backfill over the historical dataset
//!
//! Runs an entries pass, then a treatments pass. Each pass reads fixed-size
//! pages ordered by `(mills, id)`, decomposes one record at a time and keeps
//! going when a record fails. A shutdown signal is honored between batches
//! only, so a record is never left half-decomposed.

use crate::adapters::database::traits::{CheckpointStorage, HistoricalStore};
use crate::config::BackfillConfig;
use crate::core::backfill::cursor::{
    BackfillCheckpoint, BackfillCheckpointBuilder, BackfillPass, Cursor,
};
use crate::core::backfill::summary::BackfillResult;
use crate::core::decompose::{EntryDecomposer, TreatmentDecomposer};
use crate::core::transform::classifier::is_backfill_skipped;
use crate::domain::context::ResultExt;
use crate::domain::entry::Entry;
use crate::domain::errors::{DecomposerError, RecordErrorDetail};
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Backfill tuning
#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Rows per page
    pub batch_size: usize,

    /// Run the entries pass before treatments
    pub include_entries: bool,

    /// Continue each pass from its last unfinished checkpoint
    pub resume: bool,

    /// Save a checkpoint after every batch
    pub enable_checkpointing: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            include_entries: true,
            resume: false,
            enable_checkpointing: true,
        }
    }
}

impl From<&BackfillConfig> for BackfillOptions {
    fn from(config: &BackfillConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            include_entries: config.include_entries,
            resume: config.resume,
            enable_checkpointing: config.enable_checkpointing,
        }
    }
}

enum RecordOutcome {
    Processed,
    Skipped,
}

/// Per-record work of one pass
#[async_trait]
trait PassProcessor<R>: Send + Sync {
    async fn process(&self, record: &R) -> Result<RecordOutcome>;
}

#[async_trait]
impl PassProcessor<Treatment> for TreatmentDecomposer {
    async fn process(&self, treatment: &Treatment) -> Result<RecordOutcome> {
        // These already exist as spans written by the live path
        if is_backfill_skipped(treatment.event_type.as_deref()) {
            return Ok(RecordOutcome::Skipped);
        }
        self.decompose(treatment).await?;
        Ok(RecordOutcome::Processed)
    }
}

#[async_trait]
impl PassProcessor<Entry> for EntryDecomposer {
    async fn process(&self, entry: &Entry) -> Result<RecordOutcome> {
        self.decompose(entry).await?;
        Ok(RecordOutcome::Processed)
    }
}

/// Rows a pass can paginate and report failures for
trait BackfillRecord: Send + Sync {
    fn error_detail(&self, message: String) -> RecordErrorDetail;
}

impl BackfillRecord for Treatment {
    fn error_detail(&self, message: String) -> RecordErrorDetail {
        RecordErrorDetail::new(self.mills, message)
            .with_legacy_id(self.id.as_deref())
            .with_record_type(self.event_type.as_deref())
    }
}

impl BackfillRecord for Entry {
    fn error_detail(&self, message: String) -> RecordErrorDetail {
        RecordErrorDetail::new(self.mills, message)
            .with_legacy_id(self.id.as_deref())
            .with_record_type(self.entry_type.as_deref())
    }
}

#[derive(Debug, Default)]
struct PassCounters {
    processed: u64,
    failed: u64,
    skipped: u64,
    batches: u64,
    cancelled: bool,
}

/// Replays decomposition over the whole historical dataset
pub struct BackfillDriver {
    treatments: Arc<dyn HistoricalStore<Treatment>>,
    entries: Arc<dyn HistoricalStore<Entry>>,
    treatment_decomposer: TreatmentDecomposer,
    entry_decomposer: EntryDecomposer,
    checkpoints: Option<Arc<dyn CheckpointStorage>>,
    options: BackfillOptions,
    shutdown: watch::Receiver<bool>,
}

impl BackfillDriver {
    /// Create a driver without checkpoint storage
    pub fn new(
        treatments: Arc<dyn HistoricalStore<Treatment>>,
        entries: Arc<dyn HistoricalStore<Entry>>,
        treatment_decomposer: TreatmentDecomposer,
        entry_decomposer: EntryDecomposer,
        options: BackfillOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            treatments,
            entries,
            treatment_decomposer,
            entry_decomposer,
            checkpoints: None,
            options,
            shutdown,
        }
    }

    /// Attach checkpoint storage for progress saving and resume
    pub fn with_checkpoints(mut self, storage: Arc<dyn CheckpointStorage>) -> Self {
        self.checkpoints = Some(storage);
        self
    }

    /// Run both passes
    ///
    /// # Errors
    ///
    /// Returns an error only for store-level failures (counting, fetching,
    /// checkpointing). Individual record failures are counted in the result.
    pub async fn backfill(&self) -> Result<BackfillResult> {
        if self.options.batch_size == 0 {
            return Err(DecomposerError::Validation(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        let start = Instant::now();
        let mut result = BackfillResult::new();

        tracing::info!(
            batch_size = self.options.batch_size,
            include_entries = self.options.include_entries,
            resume = self.options.resume,
            checkpointing = self.checkpoints_enabled(),
            "Starting backfill"
        );

        if self.options.include_entries {
            let counters = self
                .run_pass(
                    BackfillPass::Entries,
                    self.entries.as_ref(),
                    &self.entry_decomposer,
                    &mut result,
                )
                .await?;
            result.entries_processed = counters.processed;
            result.entries_failed = counters.failed;
            result.entries_batches = counters.batches;
            result.cancelled = counters.cancelled;
        }

        if !result.cancelled {
            let counters = self
                .run_pass(
                    BackfillPass::Treatments,
                    self.treatments.as_ref(),
                    &self.treatment_decomposer,
                    &mut result,
                )
                .await?;
            result.treatments_processed = counters.processed;
            result.treatments_failed = counters.failed;
            result.treatments_skipped = counters.skipped;
            result.treatments_batches = counters.batches;
            result.cancelled = counters.cancelled;
        }

        let result = result.with_duration(start.elapsed());
        result.log_summary();
        Ok(result)
    }

    async fn run_pass<R: BackfillRecord>(
        &self,
        pass: BackfillPass,
        store: &dyn HistoricalStore<R>,
        processor: &dyn PassProcessor<R>,
        result: &mut BackfillResult,
    ) -> Result<PassCounters> {
        let total = store
            .count()
            .await
            .with_context(|| format!("Failed to count {pass}"))?;

        let mut checkpoint = self.starting_checkpoint(pass).await?;
        checkpoint.mark_started();
        self.save_checkpoint(&checkpoint).await?;

        let mut cursor: Option<Cursor> = checkpoint.cursor.clone();
        let mut scanned = checkpoint.records_scanned;
        let mut counters = PassCounters::default();

        tracing::info!(
            pass = %pass,
            total = total,
            resume_from = ?cursor,
            "Starting backfill pass"
        );

        loop {
            if self.is_cancelled() {
                tracing::warn!(pass = %pass, processed = scanned, "Backfill cancelled");
                counters.cancelled = true;
                checkpoint.mark_interrupted();
                self.save_checkpoint(&checkpoint).await?;
                return Ok(counters);
            }

            let batch = match store.fetch_after(cursor.as_ref(), self.options.batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    checkpoint.mark_failed();
                    if let Err(save_err) = self.save_checkpoint(&checkpoint).await {
                        tracing::warn!(error = %save_err, "Failed to save failed checkpoint");
                    }
                    return Err(e).with_context(|| {
                        format!("Failed to fetch {pass} after {}", display_cursor(&cursor))
                    });
                }
            };
            counters.batches += 1;
            let batch_len = batch.len();

            for row in &batch {
                let record = match &row.record {
                    Ok(record) => record,
                    Err(e) => {
                        counters.failed += 1;
                        let detail = RecordErrorDetail::new(row.cursor.mills, e.to_string())
                            .with_legacy_id(Some(row.cursor.id.as_str()));
                        tracing::warn!(
                            pass = %pass,
                            cursor = %row.cursor,
                            error = %e,
                            "Failed to decode record"
                        );
                        result.add_error(pass, detail);
                        continue;
                    }
                };

                match processor.process(record).await {
                    Ok(RecordOutcome::Processed) => counters.processed += 1,
                    Ok(RecordOutcome::Skipped) => counters.skipped += 1,
                    Err(e) => {
                        counters.failed += 1;
                        let detail = record.error_detail(e.to_string());
                        tracing::warn!(
                            pass = %pass,
                            legacy_id = ?detail.legacy_id,
                            record_type = ?detail.record_type,
                            mills = detail.mills,
                            error = %e,
                            "Failed to decompose record"
                        );
                        result.add_error(pass, detail);
                    }
                }
            }

            if let Some(last) = batch.last() {
                let next = last.cursor.clone();
                if cursor.as_ref().is_some_and(|prev| next <= *prev) {
                    return Err(DecomposerError::Backfill(format!(
                        "{pass} cursor did not advance past {}",
                        display_cursor(&cursor)
                    )));
                }
                scanned += batch_len as u64;
                checkpoint.advance(next.clone(), batch_len as u64);
                self.save_checkpoint(&checkpoint).await?;
                cursor = Some(next);
            }

            crate::log_batch_progress!(pass, scanned, total);

            if batch_len < self.options.batch_size {
                break;
            }
        }

        checkpoint.mark_completed();
        self.save_checkpoint(&checkpoint).await?;

        tracing::info!(
            pass = %pass,
            processed = counters.processed,
            failed = counters.failed,
            skipped = counters.skipped,
            batches = counters.batches,
            "Backfill pass completed"
        );

        Ok(counters)
    }

    async fn starting_checkpoint(&self, pass: BackfillPass) -> Result<BackfillCheckpoint> {
        let fresh = BackfillCheckpointBuilder::new(pass).build();

        let Some(storage) = self.checkpoints.as_ref().filter(|_| self.options.resume) else {
            return Ok(fresh);
        };

        match storage.load_checkpoint(pass).await? {
            Some(saved) if saved.is_resumable() => {
                tracing::info!(
                    pass = %pass,
                    cursor = ?saved.cursor,
                    records_scanned = saved.records_scanned,
                    "Resuming from checkpoint"
                );
                Ok(saved)
            }
            _ => Ok(fresh),
        }
    }

    async fn save_checkpoint(&self, checkpoint: &BackfillCheckpoint) -> Result<()> {
        match self.checkpoints.as_ref() {
            Some(storage) if self.options.enable_checkpointing => storage
                .save_checkpoint(checkpoint)
                .await
                .with_context(|| format!("Failed to checkpoint {}", checkpoint.pass)),
            _ => Ok(()),
        }
    }

    fn checkpoints_enabled(&self) -> bool {
        self.checkpoints.is_some() && self.options.enable_checkpointing
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}

fn display_cursor(cursor: &Option<Cursor>) -> String {
    cursor
        .as_ref()
        .map_or_else(|| "start".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCheckpointStorage, InMemoryHistoricalStore, InMemoryRepositories,
        InMemoryStateSpanService,
    };
    use crate::core::decompose::{StateSpanDelegate, UpsertCoordinator};

    fn driver(
        treatments: Vec<Treatment>,
        batch_size: usize,
    ) -> (BackfillDriver, InMemoryRepositories, watch::Sender<bool>) {
        driver_over(InMemoryHistoricalStore::new(treatments), batch_size)
    }

    fn driver_over(
        treatments: InMemoryHistoricalStore<Treatment>,
        batch_size: usize,
    ) -> (BackfillDriver, InMemoryRepositories, watch::Sender<bool>) {
        let memory = InMemoryRepositories::new();
        let upserts = UpsertCoordinator::new(memory.repositories());
        let spans = StateSpanDelegate::new(Arc::new(InMemoryStateSpanService::new()));
        let (tx, rx) = watch::channel(false);

        let driver = BackfillDriver::new(
            Arc::new(treatments),
            Arc::new(InMemoryHistoricalStore::<Entry>::empty()),
            TreatmentDecomposer::new(upserts.clone(), spans),
            EntryDecomposer::new(upserts),
            BackfillOptions {
                batch_size,
                ..Default::default()
            },
            rx,
        );
        (driver, memory, tx)
    }

    fn note(i: usize) -> Treatment {
        Treatment::new(Some(&format!("n{i:04}")), 1000 + i as i64, Some("Note"))
    }

    #[tokio::test]
    async fn test_processes_every_record() {
        let (driver, memory, _tx) = driver((0..25).map(note).collect(), 10);

        let result = driver.backfill().await.unwrap();
        assert_eq!(result.treatments_processed, 25);
        assert_eq!(result.treatments_batches, 3);
        assert_eq!(memory.notes.len().unwrap(), 25);
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_trailing_empty_page() {
        let (driver, _, _tx) = driver((0..20).map(note).collect(), 10);

        let result = driver.backfill().await.unwrap();
        assert_eq!(result.treatments_processed, 20);
        assert_eq!(result.treatments_batches, 3);
    }

    #[tokio::test]
    async fn test_skip_set_is_counted() {
        let mut treatments: Vec<_> = (0..5).map(note).collect();
        treatments.push(Treatment::new(Some("tb"), 1, Some("Temp Basal")));
        treatments.push(Treatment::new(Some("ps"), 2, Some("Profile Switch")));
        let (driver, _, _tx) = driver(treatments, 100);

        let result = driver.backfill().await.unwrap();
        assert_eq!(result.treatments_processed, 5);
        assert_eq!(result.treatments_skipped, 2);
        assert_eq!(result.treatments_scanned(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_batch() {
        let (driver, memory, tx) = driver((0..5).map(note).collect(), 10);
        tx.send(true).unwrap();

        let result = driver.backfill().await.unwrap();
        assert!(result.cancelled);
        assert_eq!(result.treatments_scanned(), 0);
        assert_eq!(memory.total_rows().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_row_is_counted_and_paged_past() {
        let store = InMemoryHistoricalStore::new((0..6).map(note).collect()).with_document(
            "n0002x",
            1002,
            serde_json::json!({"eventType": "Correction Bolus", "insulin": "1.5"}),
        );
        let (driver, memory, _tx) = driver_over(store, 3);
        let storage = Arc::new(InMemoryCheckpointStorage::new());
        let driver = driver.with_checkpoints(storage.clone());

        let result = driver.backfill().await.unwrap();
        assert_eq!(result.treatments_processed, 6);
        assert_eq!(result.treatments_failed, 1);
        assert_eq!(result.treatments_scanned(), 7);
        assert_eq!(memory.notes.len().unwrap(), 6);

        let error = &result.errors[0];
        assert_eq!(error.detail.legacy_id.as_deref(), Some("n0002x"));
        assert_eq!(error.detail.mills, 1002);

        let checkpoint = storage
            .load_checkpoint(BackfillPass::Treatments)
            .await
            .unwrap()
            .unwrap();
        assert!(checkpoint.is_completed());
        assert_eq!(checkpoint.records_scanned, 7);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let (driver, _, _tx) = driver(Vec::new(), 0);
        assert!(driver.backfill().await.is_err());
    }

    #[tokio::test]
    async fn test_checkpoint_completed_after_run() {
        let (driver, _, _tx) = driver((0..3).map(note).collect(), 2);
        let storage = Arc::new(InMemoryCheckpointStorage::new());
        let driver = driver.with_checkpoints(storage.clone());

        driver.backfill().await.unwrap();

        let checkpoint = storage
            .load_checkpoint(BackfillPass::Treatments)
            .await
            .unwrap()
            .unwrap();
        assert!(checkpoint.is_completed());
        assert_eq!(checkpoint.records_scanned, 3);
        assert_eq!(checkpoint.cursor, Some(Cursor::new(1002, "n0002")));
    }
}

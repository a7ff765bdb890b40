//! Backfill run accounting

use crate::core::backfill::cursor::BackfillPass;
use crate::domain::errors::RecordErrorDetail;
use std::time::Duration;

/// Failures kept with full context; later failures are only counted
pub const MAX_RECORDED_ERRORS: usize = 1000;

/// A record that failed during a backfill pass
#[derive(Debug, Clone)]
pub struct BackfillError {
    pub pass: BackfillPass,
    pub detail: RecordErrorDetail,
}

/// Aggregate counters of one backfill run
///
/// Per-record failures never surface as errors to the caller; they only show
/// up here.
#[derive(Debug, Clone, Default)]
pub struct BackfillResult {
    pub entries_processed: u64,
    pub entries_failed: u64,
    pub treatments_processed: u64,
    pub treatments_failed: u64,
    pub treatments_skipped: u64,

    /// Pages fetched per pass, including a final short or empty page
    pub entries_batches: u64,
    pub treatments_batches: u64,

    /// Whether the run stopped early on a shutdown signal
    pub cancelled: bool,

    pub duration: Duration,

    /// First [`MAX_RECORDED_ERRORS`] failures
    pub errors: Vec<BackfillError>,
}

impl BackfillResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a failed record; counters are updated by the caller
    pub fn add_error(&mut self, pass: BackfillPass, detail: RecordErrorDetail) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(BackfillError { pass, detail });
        }
    }

    /// Treatments read from the store
    pub fn treatments_scanned(&self) -> u64 {
        self.treatments_processed + self.treatments_failed + self.treatments_skipped
    }

    /// Entries read from the store
    pub fn entries_scanned(&self) -> u64 {
        self.entries_processed + self.entries_failed
    }

    pub fn total_failed(&self) -> u64 {
        self.entries_failed + self.treatments_failed
    }

    /// Completed without cancellation or failed records
    pub fn is_successful(&self) -> bool {
        !self.cancelled && self.total_failed() == 0
    }

    /// Share of non-skipped records that decomposed cleanly, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.entries_scanned() + self.treatments_processed + self.treatments_failed;
        if attempted == 0 {
            return 100.0;
        }
        let succeeded = self.entries_processed + self.treatments_processed;
        (succeeded as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            entries_processed = self.entries_processed,
            entries_failed = self.entries_failed,
            treatments_processed = self.treatments_processed,
            treatments_failed = self.treatments_failed,
            treatments_skipped = self.treatments_skipped,
            entries_batches = self.entries_batches,
            treatments_batches = self.treatments_batches,
            cancelled = self.cancelled,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Backfill finished"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.total_failed(),
                recorded = self.errors.len(),
                "Backfill completed with failed records"
            );
            for error in self.errors.iter().take(20) {
                tracing::warn!(
                    pass = %error.pass,
                    legacy_id = ?error.detail.legacy_id,
                    record_type = ?error.detail.record_type,
                    mills = error.detail.mills,
                    message = %error.detail.message,
                    "Backfill record failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounting() {
        let result = BackfillResult {
            treatments_processed: 2000,
            treatments_failed: 3,
            treatments_skipped: 497,
            entries_processed: 10,
            ..Default::default()
        };

        assert_eq!(result.treatments_scanned(), 2500);
        assert_eq!(result.entries_scanned(), 10);
        assert_eq!(result.total_failed(), 3);
        assert!(!result.is_successful());
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(BackfillResult::new().success_rate(), 100.0);

        let result = BackfillResult {
            treatments_processed: 3,
            treatments_failed: 1,
            treatments_skipped: 100,
            ..Default::default()
        };
        assert_eq!(result.success_rate(), 75.0);
    }

    #[test]
    fn test_error_list_is_capped() {
        let mut result = BackfillResult::new();
        for i in 0..(MAX_RECORDED_ERRORS + 5) {
            result.add_error(
                BackfillPass::Treatments,
                RecordErrorDetail::new(i as i64, "boom"),
            );
        }
        assert_eq!(result.errors.len(), MAX_RECORDED_ERRORS);
    }

    #[test]
    fn test_cancelled_run_is_not_successful() {
        let result = BackfillResult {
            cancelled: true,
            ..Default::default()
        };
        assert!(!result.is_successful());
    }
}

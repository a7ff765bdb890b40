//! Glucose entry decomposition
//!
//! Each entry maps to exactly one record by its `type`: `sgv` to a sensor
//! reading, `mbg` to a meter reading, `cal` to a calibration.

use crate::core::decompose::upsert::UpsertCoordinator;
use crate::core::decompose::DecompositionResult;
use crate::core::transform::mapper;
use crate::domain::entry::{Entry, EntryKind};
use crate::domain::ids::CorrelationId;
use crate::domain::Result;

#[derive(Clone)]
pub struct EntryDecomposer {
    upserts: UpsertCoordinator,
}

impl EntryDecomposer {
    pub fn new(upserts: UpsertCoordinator) -> Self {
        Self { upserts }
    }

    /// Decompose an entry; unknown types log a warning and produce nothing
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn decompose(&self, entry: &Entry) -> Result<DecompositionResult> {
        let correlation_id = CorrelationId::new();
        let mut result = DecompositionResult::new(correlation_id);

        match entry.kind() {
            Some(EntryKind::SensorGlucose) => {
                let outcome = self
                    .upserts
                    .upsert(mapper::to_sensor_glucose(entry, correlation_id))
                    .await?;
                result.push(outcome);
            }
            Some(EntryKind::MeterGlucose) => {
                let outcome = self
                    .upserts
                    .upsert(mapper::to_meter_glucose(entry, correlation_id))
                    .await?;
                result.push(outcome);
            }
            Some(EntryKind::Calibration) => {
                let outcome = self
                    .upserts
                    .upsert(mapper::to_calibration(entry, correlation_id))
                    .await?;
                result.push(outcome);
            }
            None => {
                tracing::warn!(
                    legacy_id = ?entry.id,
                    entry_type = ?entry.entry_type,
                    mills = entry.mills,
                    "Entry has an unknown type"
                );
            }
        }

        Ok(result)
    }
}

//! Treatment decomposition orchestration

use crate::core::decompose::state_span::StateSpanDelegate;
use crate::core::decompose::upsert::{Repositories, RepositoryFor, UpsertCoordinator, UpsertOutcome};
use crate::core::decompose::DecompositionResult;
use crate::core::transform::classifier::classify;
use crate::core::transform::mapper;
use crate::domain::ids::CorrelationId;
use crate::domain::records::TargetRecord;
use crate::domain::treatment::Treatment;
use crate::domain::Result;

/// Decomposes one legacy treatment into target records and state spans
///
/// Each call gets a fresh time-ordered correlation id that every produced
/// record carries. Targets are written in a fixed order: bolus, carb intake,
/// BG check, note, bolus calculation, device event, then the state span.
#[derive(Clone)]
pub struct TreatmentDecomposer {
    upserts: UpsertCoordinator,
    spans: StateSpanDelegate,
}

impl TreatmentDecomposer {
    pub fn new(upserts: UpsertCoordinator, spans: StateSpanDelegate) -> Self {
        Self { upserts, spans }
    }

    /// Decompose a treatment
    ///
    /// A treatment that classifies to nothing logs a warning and returns an
    /// empty result.
    ///
    /// # Errors
    ///
    /// Propagates the first repository or state span service failure.
    /// Records written before the failure stay written.
    pub async fn decompose(&self, treatment: &Treatment) -> Result<DecompositionResult> {
        let correlation_id = CorrelationId::new();
        let mut result = DecompositionResult::new(correlation_id);

        let classification = classify(
            treatment.event_type.as_deref(),
            treatment.insulin,
            treatment.carbs,
        );

        if classification.is_empty() {
            tracing::warn!(
                legacy_id = ?treatment.id,
                event_type = ?treatment.event_type,
                mills = treatment.mills,
                "Treatment matched no decomposition rule"
            );
            return Ok(result);
        }

        if classification.bolus {
            self.write(&mut result, mapper::to_bolus(treatment, correlation_id))
                .await?;
        }
        if classification.carb_intake {
            self.write(&mut result, mapper::to_carb_intake(treatment, correlation_id))
                .await?;
        }
        if classification.bg_check {
            self.write(&mut result, mapper::to_bg_check(treatment, correlation_id))
                .await?;
        }
        if classification.note {
            self.write(&mut result, mapper::to_note(treatment, correlation_id))
                .await?;
        }
        if classification.bolus_calculation {
            self.write(
                &mut result,
                mapper::to_bolus_calculation(treatment, correlation_id),
            )
            .await?;
        }
        if let Some(device_event) = classification.device_event {
            self.write(
                &mut result,
                mapper::to_device_event(treatment, correlation_id, device_event),
            )
            .await?;
        }
        if let Some(delegation) = classification.delegation {
            let outcome = self.spans.delegate(treatment, delegation).await?;
            result.push_span(outcome);
        }

        tracing::debug!(
            legacy_id = ?treatment.id,
            correlation_id = %correlation_id,
            created = result.created.len(),
            updated = result.updated.len(),
            "Treatment decomposed"
        );

        Ok(result)
    }

    async fn write<T>(&self, result: &mut DecompositionResult, record: T) -> Result<()>
    where
        T: TargetRecord,
        Repositories: RepositoryFor<T>,
    {
        let outcome: UpsertOutcome<T> = self.upserts.upsert(record).await?;
        result.push(outcome);
        Ok(())
    }
}

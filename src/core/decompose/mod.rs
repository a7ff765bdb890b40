//! Decomposition of legacy records into target records
//!
//! - [`treatment`] - treatments, with state span delegation
//! - [`entry`] - glucose entries
//! - [`upsert`] - idempotent create-or-update by legacy id
//! - [`state_span`] - interval building and delegation

pub mod entry;
pub mod state_span;
pub mod treatment;
pub mod upsert;

pub use entry::EntryDecomposer;
pub use state_span::StateSpanDelegate;
pub use treatment::TreatmentDecomposer;
pub use upsert::{Repositories, UpsertCoordinator, UpsertOutcome};

use crate::domain::ids::CorrelationId;
use crate::domain::records::{DecomposedRecord, TargetRecord};
use crate::domain::state_span::StateSpan;
use serde::Serialize;

/// Records created and updated by one decomposition call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionResult {
    pub correlation_id: CorrelationId,
    pub created: Vec<DecomposedRecord>,
    pub updated: Vec<DecomposedRecord>,
}

impl DecompositionResult {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            created: Vec::new(),
            updated: Vec::new(),
        }
    }

    /// True when nothing was created or updated
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }

    /// Number of records touched
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    /// Record a target record upsert
    pub fn push<T: TargetRecord>(&mut self, outcome: UpsertOutcome<T>) {
        match outcome {
            UpsertOutcome::Created(record) => self.created.push(record.into_decomposed()),
            UpsertOutcome::Updated(record) => self.updated.push(record.into_decomposed()),
        }
    }

    /// Record a state span outcome
    pub fn push_span(&mut self, outcome: UpsertOutcome<StateSpan>) {
        match outcome {
            UpsertOutcome::Created(span) => self.created.push(DecomposedRecord::StateSpan(span)),
            UpsertOutcome::Updated(span) => self.updated.push(DecomposedRecord::StateSpan(span)),
        }
    }

    /// Every record touched, created first
    pub fn records(&self) -> impl Iterator<Item = &DecomposedRecord> {
        self.created.iter().chain(self.updated.iter())
    }
}

//! In-memory state span service

use super::poison_err;
use crate::adapters::database::traits::StateSpanService;
use crate::core::decompose::state_span::build_basal_span;
use crate::domain::state_span::{StateSpan, StateSpanCategory};
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

type SpanKey = (StateSpanCategory, String);

/// In-memory state span store keyed by `(category, original_id)`
///
/// Spans without an original id are keyed by their own id and therefore
/// never merge with another span.
#[derive(Debug, Default)]
pub struct InMemoryStateSpanService {
    spans: RwLock<HashMap<SpanKey, StateSpan>>,
}

impl InMemoryStateSpanService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all spans, ordered by start time
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn spans(&self) -> Result<Vec<StateSpan>> {
        let mut spans: Vec<StateSpan> =
            self.spans.read().map_err(poison_err)?.values().cloned().collect();
        spans.sort_by_key(|s| s.start_mills);
        Ok(spans)
    }

    fn key(span: &StateSpan) -> SpanKey {
        let original = span
            .original_id
            .clone()
            .unwrap_or_else(|| span.id.to_string());
        (span.category, original)
    }
}

#[async_trait]
impl StateSpanService for InMemoryStateSpanService {
    async fn create_basal_delivery_from_treatment(
        &self,
        treatment: &Treatment,
    ) -> Result<StateSpan> {
        let span = build_basal_span(treatment);
        self.upsert_state_span(span).await
    }

    async fn upsert_state_span(&self, mut span: StateSpan) -> Result<StateSpan> {
        let key = Self::key(&span);
        let mut spans = self.spans.write().map_err(poison_err)?;
        if let Some(existing) = spans.get(&key) {
            span.id = existing.id;
        }
        spans.insert(key, span.clone());
        Ok(span)
    }
}

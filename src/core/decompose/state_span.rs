//! Delegation of interval-shaped treatments to the state span model
//!
//! Temp basals are forwarded as-is to the state span service. Profile switches
//! and temporary overrides are turned into spans here and handed to the
//! service's upsert, which owns interval merging.

use crate::adapters::database::traits::StateSpanService;
use crate::core::decompose::upsert::UpsertOutcome;
use crate::core::transform::classifier::StateSpanDelegation;
use crate::domain::state_span::{StateSpan, StateSpanCategory};
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Source recorded when a treatment names neither data source nor author
pub const DEFAULT_SPAN_SOURCE: &str = "nightscout";

const PROFILE_STATE: &str = "Active";
const OVERRIDE_STATE: &str = "Custom";
const TEMP_BASAL_STATE: &str = "Active";

/// Forwards delegated treatments to the [`StateSpanService`]
#[derive(Clone)]
pub struct StateSpanDelegate {
    service: Arc<dyn StateSpanService>,
}

impl StateSpanDelegate {
    pub fn new(service: Arc<dyn StateSpanService>) -> Self {
        Self { service }
    }

    /// Produce the span for a delegated treatment
    ///
    /// Temp basal spans are always reported as created. Built spans are
    /// reported as updated when the service answers with a different id,
    /// i.e. it matched an existing span.
    ///
    /// # Errors
    ///
    /// Propagates state span service errors.
    pub async fn delegate(
        &self,
        treatment: &Treatment,
        delegation: StateSpanDelegation,
    ) -> Result<UpsertOutcome<StateSpan>> {
        let span = match delegation {
            StateSpanDelegation::TempBasal => {
                let span = self
                    .service
                    .create_basal_delivery_from_treatment(treatment)
                    .await?;
                tracing::debug!(
                    span_id = %span.id,
                    legacy_id = ?treatment.id,
                    "Temp basal forwarded to state span service"
                );
                return Ok(UpsertOutcome::Created(span));
            }
            StateSpanDelegation::ProfileSwitch => build_profile_span(treatment),
            StateSpanDelegation::TemporaryOverride => build_override_span(treatment),
        };

        let built_id = span.id;
        let category = span.category;
        let stored = self.service.upsert_state_span(span).await?;

        if stored.id == built_id {
            crate::log_decomposition!("created", category, stored.id, treatment.id.as_deref());
            Ok(UpsertOutcome::Created(stored))
        } else {
            crate::log_decomposition!("updated", category, stored.id, treatment.id.as_deref());
            Ok(UpsertOutcome::Updated(stored))
        }
    }
}

/// Builds the `Profile` span of a profile switch
pub fn build_profile_span(t: &Treatment) -> StateSpan {
    let mut span = base_span(t, StateSpanCategory::Profile, PROFILE_STATE);
    let metadata = &mut span.metadata;
    insert(metadata, "profileName", t.profile.clone());
    insert(metadata, "profileJson", t.profile_json.clone());
    insert(metadata, "percentage", t.percentage);
    insert(metadata, "timeshift", t.timeshift);
    insert(metadata, "enteredBy", t.entered_by.clone());
    span
}

/// Builds the `Override` span of a temporary override
pub fn build_override_span(t: &Treatment) -> StateSpan {
    let mut span = base_span(t, StateSpanCategory::Override, OVERRIDE_STATE);
    let metadata = &mut span.metadata;
    insert(metadata, "reason", t.reason.clone());
    insert(metadata, "reasonDisplay", t.reason_display.clone());
    insert(metadata, "targetTop", t.target_top);
    insert(metadata, "targetBottom", t.target_bottom);
    insert(metadata, "insulinNeedsScaleFactor", t.insulin_needs_scale_factor);
    insert(metadata, "durationType", t.duration_type.clone());
    insert(metadata, "enteredBy", t.entered_by.clone());
    span
}

/// Builds the `TempBasal` span of a temp basal treatment
///
/// Used by the bundled state span services; the decomposer itself never
/// builds basal spans.
pub fn build_basal_span(t: &Treatment) -> StateSpan {
    let mut span = base_span(t, StateSpanCategory::TempBasal, TEMP_BASAL_STATE);
    let metadata = &mut span.metadata;
    insert(metadata, "rate", t.rate);
    insert(metadata, "absolute", t.absolute);
    insert(metadata, "percent", t.percent);
    insert(metadata, "enteredBy", t.entered_by.clone());
    span
}

fn base_span(t: &Treatment, category: StateSpanCategory, state: &str) -> StateSpan {
    let source = t.source().unwrap_or(DEFAULT_SPAN_SOURCE);
    let mut span = StateSpan::new(category, state, t.mills, source);
    span.end_mills = end_mills(t);
    span.original_id = t.id.clone();
    span.metadata
        .insert("utcOffset".to_string(), Value::from(t.utc_offset.unwrap_or(0)));
    span
}

/// `mills + duration` for a positive duration in minutes, else open-ended
///
/// An end past the `i64` range is also left open.
fn end_mills(t: &Treatment) -> Option<i64> {
    let millis = t
        .duration
        .filter(|minutes| *minutes > 0.0)
        .map(|minutes| (minutes * 60_000.0).round())
        .filter(|millis| millis.is_finite() && *millis < i64::MAX as f64)?;
    t.mills.checked_add(millis as i64)
}

fn insert<V: Into<Value>>(metadata: &mut BTreeMap<String, Value>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        metadata.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateSpanService;
    use serde_json::json;

    const T: i64 = 1_700_000_000_000;

    fn profile_switch() -> Treatment {
        let mut t = Treatment::new(Some("ps1"), T, Some("Profile Switch"));
        t.duration = Some(120.0);
        t.profile = Some("Weekday".to_string());
        t
    }

    #[test]
    fn test_profile_span() {
        let span = build_profile_span(&profile_switch());

        assert_eq!(span.category, StateSpanCategory::Profile);
        assert_eq!(span.state, "Active");
        assert_eq!(span.start_mills, T);
        assert_eq!(span.end_mills, Some(T + 7_200_000));
        assert_eq!(span.source, "nightscout");
        assert_eq!(span.original_id.as_deref(), Some("ps1"));

        let expected: BTreeMap<String, Value> = [
            ("profileName".to_string(), json!("Weekday")),
            ("utcOffset".to_string(), json!(0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(span.metadata, expected);
    }

    #[test]
    fn test_zero_duration_is_open_ended() {
        let mut t = profile_switch();
        t.duration = Some(0.0);
        assert!(build_profile_span(&t).is_open());

        t.duration = None;
        assert!(build_profile_span(&t).is_open());
    }

    #[test]
    fn test_unrepresentable_end_is_open_ended() {
        let mut t = profile_switch();
        t.duration = Some(1e300);
        assert_eq!(build_profile_span(&t).end_mills, None);

        t.duration = Some(f64::INFINITY);
        assert_eq!(build_override_span(&t).end_mills, None);

        t.duration = Some(30.0);
        t.mills = i64::MAX - 1_000;
        let span = build_basal_span(&t);
        assert_eq!(span.start_mills, i64::MAX - 1_000);
        assert!(span.is_open());
    }

    #[test]
    fn test_source_precedence() {
        let mut t = profile_switch();
        t.entered_by = Some("careportal".to_string());
        assert_eq!(build_profile_span(&t).source, "careportal");

        t.data_source = Some("loop".to_string());
        assert_eq!(build_profile_span(&t).source, "loop");
    }

    #[test]
    fn test_override_span_metadata_only_present_fields() {
        let mut t = Treatment::new(Some("o1"), T, Some("Temporary Override"));
        t.reason = Some("Exercise".to_string());
        t.target_top = Some(160.0);
        t.insulin_needs_scale_factor = Some(0.8);
        t.utc_offset = Some(60);
        t.duration = Some(30.0);

        let span = build_override_span(&t);
        assert_eq!(span.category, StateSpanCategory::Override);
        assert_eq!(span.state, "Custom");
        assert_eq!(span.end_mills, Some(T + 1_800_000));
        assert_eq!(span.metadata.len(), 4);
        assert_eq!(span.metadata["reason"], json!("Exercise"));
        assert_eq!(span.metadata["targetTop"], json!(160.0));
        assert_eq!(span.metadata["utcOffset"], json!(60));
        assert!(!span.metadata.contains_key("targetBottom"));
    }

    #[test]
    fn test_basal_span() {
        let mut t = Treatment::new(Some("tb"), T, Some("Temp Basal"));
        t.absolute = Some(0.35);
        t.duration = Some(30.0);

        let span = build_basal_span(&t);
        assert_eq!(span.category, StateSpanCategory::TempBasal);
        assert_eq!(span.metadata["absolute"], json!(0.35));
        assert!(!span.metadata.contains_key("rate"));
    }

    #[tokio::test]
    async fn test_delegate_reports_created_then_updated() {
        let delegate = StateSpanDelegate::new(Arc::new(InMemoryStateSpanService::new()));
        let t = profile_switch();

        let first = delegate
            .delegate(&t, StateSpanDelegation::ProfileSwitch)
            .await
            .unwrap();
        assert!(first.is_created());

        let second = delegate
            .delegate(&t, StateSpanDelegation::ProfileSwitch)
            .await
            .unwrap();
        assert!(!second.is_created());
        assert_eq!(first.into_inner().id, second.into_inner().id);
    }

    #[tokio::test]
    async fn test_temp_basal_always_created() {
        let delegate = StateSpanDelegate::new(Arc::new(InMemoryStateSpanService::new()));
        let t = Treatment::new(Some("tb"), T, Some("Temp Basal"));

        for _ in 0..2 {
            let outcome = delegate
                .delegate(&t, StateSpanDelegation::TempBasal)
                .await
                .unwrap();
            assert!(outcome.is_created());
        }
    }
}

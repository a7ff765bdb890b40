//! End-to-end decomposition against the in-memory adapters

use nocturne_decomposer::adapters::memory::{InMemoryRepositories, InMemoryStateSpanService};
use nocturne_decomposer::core::decompose::{
    EntryDecomposer, StateSpanDelegate, TreatmentDecomposer, UpsertCoordinator,
};
use nocturne_decomposer::domain::{
    DecomposedRecord, Entry, GlucoseType, StateSpanCategory, Treatment,
};
use std::collections::HashSet;
use std::sync::Arc;

struct Harness {
    repos: InMemoryRepositories,
    spans: Arc<InMemoryStateSpanService>,
    decomposer: TreatmentDecomposer,
}

fn harness() -> Harness {
    let repos = InMemoryRepositories::new();
    let spans = Arc::new(InMemoryStateSpanService::new());
    let decomposer = TreatmentDecomposer::new(
        UpsertCoordinator::new(repos.repositories()),
        StateSpanDelegate::new(spans.clone()),
    );
    Harness {
        repos,
        spans,
        decomposer,
    }
}

fn treatment(json: &str) -> Treatment {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_meal_bolus_creates_bolus_and_carbs_then_updates() {
    let h = harness();
    let t = treatment(
        r#"{"_id":"abc","mills":1700000000000,"eventType":"Meal Bolus","insulin":4.0,"carbs":50}"#,
    );

    let first = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(first.created.len(), 2);
    assert!(first.updated.is_empty());

    let bolus = h.repos.boluses.all().unwrap().remove(0);
    let carbs = h.repos.carb_intakes.all().unwrap().remove(0);
    assert_eq!(bolus.insulin, 4.0);
    assert_eq!(carbs.carbs, 50.0);
    assert_eq!(bolus.header.correlation_id, first.correlation_id);
    assert_eq!(carbs.header.correlation_id, first.correlation_id);

    let second = h.decomposer.decompose(&t).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated.len(), 2);
    assert_ne!(second.correlation_id, first.correlation_id);

    let first_ids: HashSet<_> = first.records().map(DecomposedRecord::id).collect();
    let second_ids: HashSet<_> = second.records().map(DecomposedRecord::id).collect();
    assert_eq!(first_ids, second_ids);
    assert_eq!(h.repos.total_rows().unwrap(), 2);
}

#[tokio::test]
async fn test_bg_check_falls_back_to_glucose() {
    let h = harness();
    let t = treatment(
        r#"{"_id":"bg1","mills":1,"eventType":"BG Check","glucose":110,"glucoseType":"Finger","mgdl":null}"#,
    );

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(result.created.len(), 1);

    let DecomposedRecord::BgCheck(check) = &result.created[0] else {
        panic!("expected a BG check, got {:?}", result.created[0]);
    };
    assert_eq!(check.mgdl, 110.0);
    assert_eq!(check.glucose_type, Some(GlucoseType::Finger));
}

#[tokio::test]
async fn test_bolus_wizard_without_insulin_is_calculation_only() {
    let h = harness();
    let t = treatment(r#"{"_id":"bw1","mills":1,"eventType":"Bolus Wizard","insulin":0,"carbInput":30}"#);

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(result.created.len(), 1);
    assert!(matches!(
        &result.created[0],
        DecomposedRecord::BolusCalculation(calc) if calc.carb_input == Some(30.0)
    ));
    assert!(h.repos.boluses.is_empty().unwrap());
}

#[tokio::test]
async fn test_profile_switch_builds_closed_span() {
    let h = harness();
    let start = 1_700_000_000_000_i64;
    let t = treatment(&format!(
        r#"{{"_id":"ps1","mills":{start},"eventType":"Profile Switch","duration":120,"profile":"Weekday"}}"#
    ));

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(result.created.len(), 1);

    let spans = h.spans.spans().unwrap();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.category, StateSpanCategory::Profile);
    assert_eq!(span.start_mills, start);
    assert_eq!(span.end_mills, Some(start + 7_200_000));
    assert_eq!(span.original_id.as_deref(), Some("ps1"));
    assert_eq!(span.metadata["profileName"], serde_json::json!("Weekday"));
    assert_eq!(span.metadata["utcOffset"], serde_json::json!(0));
    assert_eq!(span.metadata.len(), 2);

    let again = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(again.updated.len(), 1);
    assert_eq!(h.spans.spans().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_event_is_empty_result() {
    let h = harness();
    let t = treatment(r#"{"_id":"u1","mills":1,"eventType":"Unknown Thing","insulin":null,"carbs":null}"#);

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(h.repos.total_rows().unwrap(), 0);
    assert!(h.spans.spans().unwrap().is_empty());
}

#[tokio::test]
async fn test_insulin_and_carbs_always_give_both() {
    for event_type in ["Note", "BG Check", "Site Change", "Something Else", ""] {
        let h = harness();
        let mut t = Treatment::new(Some("x1"), 1, Some(event_type));
        t.insulin = Some(1.0);
        t.carbs = Some(10.0);

        let result = h.decomposer.decompose(&t).await.unwrap();
        assert!(
            result.records().any(|r| matches!(r, DecomposedRecord::Bolus(_))),
            "no bolus for {event_type:?}"
        );
        assert!(
            result.records().any(|r| matches!(r, DecomposedRecord::CarbIntake(_))),
            "no carb intake for {event_type:?}"
        );
    }
}

#[tokio::test]
async fn test_temp_basal_with_insulin_and_carbs_is_delegated_and_decomposed() {
    let h = harness();
    let mut t = Treatment::new(Some("tb1"), 1000, Some("Temp Basal"));
    t.rate = Some(0.8);
    t.duration = Some(30.0);
    t.insulin = Some(0.5);
    t.carbs = Some(12.0);

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(result.created.len(), 3);
    assert_eq!(h.spans.spans().unwrap()[0].category, StateSpanCategory::TempBasal);
    assert_eq!(h.repos.boluses.len().unwrap(), 1);
    assert_eq!(h.repos.carb_intakes.len().unwrap(), 1);
}

#[tokio::test]
async fn test_every_record_shares_the_correlation_id() {
    let h = harness();
    let t = treatment(
        r#"{"_id":"w1","mills":5,"eventType":"Bolus Wizard","insulin":3.5,"carbs":40,"carbInput":40,"glucose":140}"#,
    );

    let result = h.decomposer.decompose(&t).await.unwrap();
    assert!(result.len() >= 3);
    for record in result.records() {
        let header = record.header().unwrap();
        assert_eq!(header.correlation_id, result.correlation_id);
        assert_eq!(header.legacy_id.as_ref().unwrap().as_str(), "w1");
    }
}

#[tokio::test]
async fn test_records_without_legacy_id_are_always_created() {
    let h = harness();
    let mut t = Treatment::new(None, 1, Some("Correction Bolus"));
    t.insulin = Some(2.0);

    h.decomposer.decompose(&t).await.unwrap();
    h.decomposer.decompose(&t).await.unwrap();
    assert_eq!(h.repos.boluses.len().unwrap(), 2);
}

#[tokio::test]
async fn test_write_failure_propagates() {
    let h = harness();
    h.repos.boluses.fail_writes_for("bad").unwrap();
    let mut t = Treatment::new(Some("bad"), 1, Some("Correction Bolus"));
    t.insulin = Some(1.0);

    assert!(h.decomposer.decompose(&t).await.is_err());
}

#[tokio::test]
async fn test_entry_decomposition_is_idempotent() {
    let repos = InMemoryRepositories::new();
    let decomposer = EntryDecomposer::new(UpsertCoordinator::new(repos.repositories()));
    let entry: Entry =
        serde_json::from_str(r#"{"_id":"e1","date":1700000000000,"type":"sgv","sgv":123,"direction":"Flat"}"#)
            .unwrap();

    let first = decomposer.decompose(&entry).await.unwrap();
    let second = decomposer.decompose(&entry).await.unwrap();

    assert_eq!(first.created.len(), 1);
    assert_eq!(second.updated.len(), 1);
    assert_eq!(first.created[0].id(), second.updated[0].id());

    let readings = repos.sensor_glucose.all().unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].mgdl, 123.0);
    assert_eq!(readings[0].direction.as_deref(), Some("Flat"));
}

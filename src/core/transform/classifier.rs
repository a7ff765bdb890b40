//! Treatment classification
//!
//! Decides which target records a legacy treatment produces and whether it is
//! delegated to the state-span model. Rules are evaluated top to bottom and the
//! first match wins; the insulin-and-carbs rule is applied afterwards on top of
//! whatever matched, including a delegation.

use crate::domain::records::DeviceEventType;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Interval categories a treatment can be handed off to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSpanDelegation {
    TempBasal,
    ProfileSwitch,
    TemporaryOverride,
}

/// Produce flags and delegation decision for one treatment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub bolus: bool,
    pub carb_intake: bool,
    pub bg_check: bool,
    pub note: bool,
    pub bolus_calculation: bool,
    pub device_event: Option<DeviceEventType>,
    pub delegation: Option<StateSpanDelegation>,
}

impl Classification {
    /// True when nothing would be produced or delegated
    pub fn is_empty(&self) -> bool {
        !self.bolus
            && !self.carb_intake
            && !self.bg_check
            && !self.note
            && !self.bolus_calculation
            && self.device_event.is_none()
            && self.delegation.is_none()
    }
}

/// Temp basal event type spellings seen in the wild (lowercased)
pub static TEMP_BASAL_EVENT_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "temp basal",
        "temp basal start",
        "temp basal end",
        "tempbasal",
        "temporary basal",
    ])
});

/// Event types a backfill skips because the live path already wrote them as spans
pub static BACKFILL_SKIP_EVENT_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut set = TEMP_BASAL_EVENT_TYPES.clone();
    set.insert("profile switch");
    set
});

static DEVICE_EVENT_TYPES: LazyLock<HashMap<&'static str, DeviceEventType>> =
    LazyLock::new(|| {
        HashMap::from([
            ("site change", DeviceEventType::SiteChange),
            ("sensor start", DeviceEventType::SensorStart),
            ("sensor change", DeviceEventType::SensorChange),
            ("sensor stop", DeviceEventType::SensorStop),
            ("pump battery change", DeviceEventType::PumpBatteryChange),
            ("insulin change", DeviceEventType::InsulinChange),
            ("pod change", DeviceEventType::PodChange),
            ("cannula change", DeviceEventType::CannulaChange),
            ("pump resume", DeviceEventType::PumpResume),
            ("pump suspend", DeviceEventType::PumpSuspend),
        ])
    });

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Delegate(StateSpanDelegation),
    Device,
    BolusAndCarbs,
    Bolus,
    Carbs,
    BgCheck,
    Note,
    BolusWizard,
}

type Predicate = fn(&str) -> bool;

/// Ordered rule table over the lowercased event type
static RULES: &[(Predicate, Outcome)] = &[
    (
        |t| TEMP_BASAL_EVENT_TYPES.contains(t),
        Outcome::Delegate(StateSpanDelegation::TempBasal),
    ),
    (
        |t| t == "profile switch",
        Outcome::Delegate(StateSpanDelegation::ProfileSwitch),
    ),
    (
        |t| t == "temporary override",
        Outcome::Delegate(StateSpanDelegation::TemporaryOverride),
    ),
    (|t| DEVICE_EVENT_TYPES.contains_key(t), Outcome::Device),
    (
        |t| t == "meal bolus" || t == "snack bolus",
        Outcome::BolusAndCarbs,
    ),
    (|t| t == "correction bolus", Outcome::Bolus),
    (|t| t == "carb correction", Outcome::Carbs),
    (|t| t == "bg check", Outcome::BgCheck),
    (|t| t == "announcement", Outcome::Note),
    (
        |t| t == "note" || t == "question" || t == "exercise",
        Outcome::Note,
    ),
    (|t| t == "bolus wizard", Outcome::BolusWizard),
];

/// Classifies a treatment by event type, insulin and carbs
///
/// Total and deterministic: an unknown event type with no insulin or carbs
/// yields an empty classification, never an error.
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::core::transform::classifier::classify;
///
/// let c = classify(Some("Meal Bolus"), Some(4.0), Some(50.0));
/// assert!(c.bolus && c.carb_intake);
///
/// let c = classify(Some("Bolus Wizard"), Some(0.0), None);
/// assert!(c.bolus_calculation && !c.bolus);
/// ```
pub fn classify(
    event_type: Option<&str>,
    insulin: Option<f64>,
    carbs: Option<f64>,
) -> Classification {
    let mut classification = Classification::default();
    let has_insulin = insulin.is_some_and(|v| v > 0.0);
    let has_carbs = carbs.is_some_and(|v| v > 0.0);

    if let Some(normalized) = normalize(event_type) {
        let matched = RULES
            .iter()
            .find(|(predicate, _)| predicate(&normalized))
            .map(|(_, outcome)| *outcome);

        match matched {
            Some(Outcome::Delegate(delegation)) => classification.delegation = Some(delegation),
            Some(Outcome::Device) => {
                classification.device_event = DEVICE_EVENT_TYPES.get(normalized.as_str()).copied()
            }
            Some(Outcome::BolusAndCarbs) => {
                classification.bolus = true;
                classification.carb_intake = true;
            }
            Some(Outcome::Bolus) => classification.bolus = true,
            Some(Outcome::Carbs) => classification.carb_intake = true,
            Some(Outcome::BgCheck) => classification.bg_check = true,
            Some(Outcome::Note) => classification.note = true,
            Some(Outcome::BolusWizard) => {
                classification.bolus_calculation = true;
                classification.bolus = has_insulin;
            }
            None => {}
        }
    }

    if has_insulin && has_carbs {
        classification.bolus = true;
        classification.carb_intake = true;
    }

    classification
}

/// Whether a backfill should count this event type as skipped
pub fn is_backfill_skipped(event_type: Option<&str>) -> bool {
    normalize(event_type).is_some_and(|t| BACKFILL_SKIP_EVENT_TYPES.contains(t.as_str()))
}

/// Whether the event type is an announcement note
pub fn is_announcement(event_type: Option<&str>) -> bool {
    normalize(event_type).is_some_and(|t| t == "announcement")
}

fn normalize(event_type: Option<&str>) -> Option<String> {
    event_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

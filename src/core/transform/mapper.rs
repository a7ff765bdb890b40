//! Legacy-to-target field mapping
//!
//! One pure function per target record type. None of these touch storage;
//! identity resolution against existing rows happens later in the upsert
//! coordinator.

use crate::core::transform::classifier::is_announcement;
use crate::core::transform::parse::parse_lenient;
use crate::domain::entry::Entry;
use crate::domain::ids::CorrelationId;
use crate::domain::records::{
    BgCheck, Bolus, BolusCalculation, Calibration, CarbIntake, DeviceEvent, DeviceEventType,
    GlucoseUnit, MeterGlucose, Note, RecordHeader, SensorGlucose,
};
use crate::domain::treatment::Treatment;

/// mg/dL per mmol/L
pub const MGDL_PER_MMOL: f64 = 18.01559;

fn treatment_header(t: &Treatment, correlation_id: CorrelationId) -> RecordHeader {
    RecordHeader::new(t.id.as_deref(), t.mills, correlation_id).with_provenance(
        t.utc_offset,
        t.device.as_deref(),
        t.source(),
    )
}

fn entry_header(e: &Entry, correlation_id: CorrelationId) -> RecordHeader {
    RecordHeader::new(e.id.as_deref(), e.mills, correlation_id).with_provenance(
        e.utc_offset,
        e.device.as_deref(),
        e.data_source.as_deref(),
    )
}

/// Maps a treatment to a bolus; missing insulin becomes 0
pub fn to_bolus(t: &Treatment, correlation_id: CorrelationId) -> Bolus {
    Bolus {
        header: treatment_header(t, correlation_id),
        insulin: t.insulin.unwrap_or(0.0),
        programmed: t.programmed,
        delivered: t.insulin_delivered,
        bolus_type: parse_lenient(t.bolus_type.as_deref()),
        automatic: t.automatic.unwrap_or(false),
        duration: t.duration,
        is_basal_insulin: t.is_basal_insulin.unwrap_or(false),
        insulin_type: t.insulin_type.clone(),
        sync_identifier: t.sync_identifier.clone(),
    }
}

/// Maps a treatment to a carb intake; missing carbs become 0
pub fn to_carb_intake(t: &Treatment, correlation_id: CorrelationId) -> CarbIntake {
    CarbIntake {
        header: treatment_header(t, correlation_id),
        carbs: t.carbs.unwrap_or(0.0),
        protein: t.protein,
        fat: t.fat,
        food_type: t.food_type.clone(),
        absorption_time: t.absorption_time,
        sync_identifier: t.sync_identifier.clone(),
    }
}

/// Maps a treatment to a blood glucose check
///
/// `mgdl` falls back to `glucose`, converted from mmol/L when the record's
/// units say so. `mmol` falls back to the mg/dL value divided by
/// [`MGDL_PER_MMOL`].
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::core::transform::mapper::to_bg_check;
/// use nocturne_decomposer::domain::{CorrelationId, GlucoseType, Treatment};
///
/// let mut t = Treatment::new(Some("bg1"), 0, Some("BG Check"));
/// t.glucose = Some(110.0);
/// t.glucose_type = Some("Finger".to_string());
///
/// let bg = to_bg_check(&t, CorrelationId::new());
/// assert_eq!(bg.mgdl, 110.0);
/// assert_eq!(bg.glucose_type, Some(GlucoseType::Finger));
/// ```
pub fn to_bg_check(t: &Treatment, correlation_id: CorrelationId) -> BgCheck {
    let units: Option<GlucoseUnit> = parse_lenient(t.units.as_deref());

    let mgdl = t
        .mgdl
        .or_else(|| match units {
            Some(GlucoseUnit::Mmol) => t.glucose.map(|g| g * MGDL_PER_MMOL),
            _ => t.glucose,
        })
        .unwrap_or(0.0);
    let mmol = t.mmol.or(Some(mgdl / MGDL_PER_MMOL));

    BgCheck {
        header: treatment_header(t, correlation_id),
        glucose: t.glucose.unwrap_or(mgdl),
        mgdl,
        mmol,
        glucose_type: parse_lenient(t.glucose_type.as_deref()),
        units,
        sync_identifier: t.sync_identifier.clone(),
    }
}

/// Maps a treatment to a free-text note
pub fn to_note(t: &Treatment, correlation_id: CorrelationId) -> Note {
    Note {
        header: treatment_header(t, correlation_id),
        text: t.notes.clone(),
        event_type: t.trimmed_event_type().map(str::to_string),
        is_announcement: is_announcement(t.event_type.as_deref()),
    }
}

/// Maps a treatment to a device maintenance event
pub fn to_device_event(
    t: &Treatment,
    correlation_id: CorrelationId,
    event_type: DeviceEventType,
) -> DeviceEvent {
    DeviceEvent {
        header: treatment_header(t, correlation_id),
        event_type,
        notes: t.notes.clone(),
    }
}

/// Maps a treatment to a bolus calculator record
pub fn to_bolus_calculation(t: &Treatment, correlation_id: CorrelationId) -> BolusCalculation {
    BolusCalculation {
        header: treatment_header(t, correlation_id),
        blood_glucose_input: t.blood_glucose_input,
        blood_glucose_input_source: t.blood_glucose_input_source.clone(),
        carb_input: t.carb_input,
        insulin_on_board: t.insulin_on_board,
        insulin_recommendation: t.insulin_recommendation,
        carb_ratio: t.carb_ratio,
        calculation_type: parse_lenient(t.calculation_type.as_deref()),
        entered_insulin: t.insulin,
    }
}

pub fn to_sensor_glucose(e: &Entry, correlation_id: CorrelationId) -> SensorGlucose {
    SensorGlucose {
        header: entry_header(e, correlation_id),
        mgdl: e.sgv.unwrap_or(0.0),
        direction: e.direction.clone(),
        noise: e.noise,
        filtered: e.filtered,
        unfiltered: e.unfiltered,
        rssi: e.rssi,
    }
}

pub fn to_meter_glucose(e: &Entry, correlation_id: CorrelationId) -> MeterGlucose {
    MeterGlucose {
        header: entry_header(e, correlation_id),
        mgdl: e.mbg.unwrap_or(0.0),
    }
}

pub fn to_calibration(e: &Entry, correlation_id: CorrelationId) -> Calibration {
    Calibration {
        header: entry_header(e, correlation_id),
        slope: e.slope,
        intercept: e.intercept,
        scale: e.scale,
    }
}

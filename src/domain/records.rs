//! Typed target records
//!
//! Each legacy record decomposes into zero or more of these single-purpose
//! records. Every record carries a [`RecordHeader`] with its generated identity,
//! the legacy back-reference used as the upsert key, its timestamp and the
//! correlation id of the decomposition call that produced it.

use crate::domain::ids::{CorrelationId, LegacyId, RecordId};
use crate::domain::state_span::StateSpan;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields shared by every target record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHeader {
    pub id: RecordId,
    pub legacy_id: Option<LegacyId>,
    pub mills: i64,
    pub utc_offset: Option<i32>,
    pub device: Option<String>,
    pub data_source: Option<String>,
    pub correlation_id: CorrelationId,
}

impl RecordHeader {
    /// Creates a header with a freshly generated record id
    pub fn new(legacy_id: Option<&str>, mills: i64, correlation_id: CorrelationId) -> Self {
        Self {
            id: RecordId::new(),
            legacy_id: LegacyId::from_optional(legacy_id),
            mills,
            utc_offset: None,
            device: None,
            data_source: None,
            correlation_id,
        }
    }

    /// Sets provenance fields
    pub fn with_provenance(
        mut self,
        utc_offset: Option<i32>,
        device: Option<&str>,
        data_source: Option<&str>,
    ) -> Self {
        self.utc_offset = utc_offset;
        self.device = device.map(str::to_string);
        self.data_source = data_source.map(str::to_string);
        self
    }
}

/// Kind of target record; one storage table per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Bolus,
    CarbIntake,
    BgCheck,
    Note,
    DeviceEvent,
    BolusCalculation,
    SensorGlucose,
    MeterGlucose,
    Calibration,
}

impl RecordKind {
    /// Short name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bolus => "bolus",
            Self::CarbIntake => "carb_intake",
            Self::BgCheck => "bg_check",
            Self::Note => "note",
            Self::DeviceEvent => "device_event",
            Self::BolusCalculation => "bolus_calculation",
            Self::SensorGlucose => "sensor_glucose",
            Self::MeterGlucose => "meter_glucose",
            Self::Calibration => "calibration",
        }
    }

    /// Storage table holding records of this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Bolus => "boluses",
            Self::CarbIntake => "carb_intakes",
            Self::BgCheck => "bg_checks",
            Self::Note => "notes",
            Self::DeviceEvent => "device_events",
            Self::BolusCalculation => "bolus_calculations",
            Self::SensorGlucose => "sensor_glucose",
            Self::MeterGlucose => "meter_glucose",
            Self::Calibration => "calibrations",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by every target record type
pub trait TargetRecord:
    Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Kind of this record type
    const KIND: RecordKind;

    fn header(&self) -> &RecordHeader;

    fn header_mut(&mut self) -> &mut RecordHeader;

    /// Wraps the record into the heterogeneous result type
    fn into_decomposed(self) -> DecomposedRecord;
}

macro_rules! impl_target_record {
    ($ty:ident) => {
        impl TargetRecord for $ty {
            const KIND: RecordKind = RecordKind::$ty;

            fn header(&self) -> &RecordHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut RecordHeader {
                &mut self.header
            }

            fn into_decomposed(self) -> DecomposedRecord {
                DecomposedRecord::$ty(self)
            }
        }
    };
}

/// Delivery shape of a bolus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BolusType {
    Normal,
    Square,
    Dual,
}

/// How a glucose value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlucoseType {
    Finger,
    Sensor,
    Manual,
}

/// Unit a glucose value was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlucoseUnit {
    MgDl,
    Mmol,
}

/// Origin of a bolus calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationType {
    Suggested,
    Manual,
    Automatic,
}

/// Device maintenance events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEventType {
    SiteChange,
    SensorStart,
    SensorChange,
    SensorStop,
    PumpBatteryChange,
    InsulinChange,
    PodChange,
    CannulaChange,
    PumpResume,
    PumpSuspend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bolus {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub insulin: f64,
    pub programmed: Option<f64>,
    pub delivered: Option<f64>,
    pub bolus_type: Option<BolusType>,
    pub automatic: bool,
    /// Extended portion duration in minutes
    pub duration: Option<f64>,
    pub is_basal_insulin: bool,
    pub insulin_type: Option<String>,
    pub sync_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbIntake {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub carbs: f64,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub food_type: Option<String>,
    pub absorption_time: Option<f64>,
    pub sync_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgCheck {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub glucose: f64,
    pub mgdl: f64,
    pub mmol: Option<f64>,
    pub glucose_type: Option<GlucoseType>,
    pub units: Option<GlucoseUnit>,
    pub sync_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub text: Option<String>,
    pub event_type: Option<String>,
    pub is_announcement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub event_type: DeviceEventType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BolusCalculation {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub blood_glucose_input: Option<f64>,
    pub blood_glucose_input_source: Option<String>,
    pub carb_input: Option<f64>,
    pub insulin_on_board: Option<f64>,
    pub insulin_recommendation: Option<f64>,
    pub carb_ratio: Option<f64>,
    pub calculation_type: Option<CalculationType>,
    pub entered_insulin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorGlucose {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub mgdl: f64,
    pub direction: Option<String>,
    pub noise: Option<i32>,
    pub filtered: Option<f64>,
    pub unfiltered: Option<f64>,
    pub rssi: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterGlucose {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub mgdl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    #[serde(flatten)]
    pub header: RecordHeader,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub scale: Option<f64>,
}

impl_target_record!(Bolus);
impl_target_record!(CarbIntake);
impl_target_record!(BgCheck);
impl_target_record!(Note);
impl_target_record!(DeviceEvent);
impl_target_record!(BolusCalculation);
impl_target_record!(SensorGlucose);
impl_target_record!(MeterGlucose);
impl_target_record!(Calibration);

/// Any record a decomposition can create or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecomposedRecord {
    Bolus(Bolus),
    CarbIntake(CarbIntake),
    BgCheck(BgCheck),
    Note(Note),
    DeviceEvent(DeviceEvent),
    BolusCalculation(BolusCalculation),
    SensorGlucose(SensorGlucose),
    MeterGlucose(MeterGlucose),
    Calibration(Calibration),
    StateSpan(StateSpan),
}

impl DecomposedRecord {
    /// Header of a target record; `None` for state spans
    pub fn header(&self) -> Option<&RecordHeader> {
        match self {
            Self::Bolus(r) => Some(&r.header),
            Self::CarbIntake(r) => Some(&r.header),
            Self::BgCheck(r) => Some(&r.header),
            Self::Note(r) => Some(&r.header),
            Self::DeviceEvent(r) => Some(&r.header),
            Self::BolusCalculation(r) => Some(&r.header),
            Self::SensorGlucose(r) => Some(&r.header),
            Self::MeterGlucose(r) => Some(&r.header),
            Self::Calibration(r) => Some(&r.header),
            Self::StateSpan(_) => None,
        }
    }

    /// Generated identity of the record or span
    pub fn id(&self) -> RecordId {
        match self {
            Self::StateSpan(span) => span.id,
            other => other
                .header()
                .map(|h| h.id)
                .unwrap_or_default(),
        }
    }

    /// Short name of the variant for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bolus(_) => RecordKind::Bolus.as_str(),
            Self::CarbIntake(_) => RecordKind::CarbIntake.as_str(),
            Self::BgCheck(_) => RecordKind::BgCheck.as_str(),
            Self::Note(_) => RecordKind::Note.as_str(),
            Self::DeviceEvent(_) => RecordKind::DeviceEvent.as_str(),
            Self::BolusCalculation(_) => RecordKind::BolusCalculation.as_str(),
            Self::SensorGlucose(_) => RecordKind::SensorGlucose.as_str(),
            Self::MeterGlucose(_) => RecordKind::MeterGlucose.as_str(),
            Self::Calibration(_) => RecordKind::Calibration.as_str(),
            Self::StateSpan(_) => "state_span",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordHeader {
        RecordHeader::new(Some("abc"), 1_700_000_000_000, CorrelationId::new())
    }

    #[test]
    fn test_header_drops_blank_legacy_id() {
        let header = RecordHeader::new(Some(""), 1, CorrelationId::new());
        assert!(header.legacy_id.is_none());
    }

    #[test]
    fn test_record_kind_names() {
        assert_eq!(Bolus::KIND, RecordKind::Bolus);
        assert_eq!(RecordKind::CarbIntake.table_name(), "carb_intakes");
        assert_eq!(RecordKind::BgCheck.to_string(), "bg_check");
    }

    #[test]
    fn test_flattened_header_serialization() {
        let note = Note {
            header: header(),
            text: Some("hello".to_string()),
            event_type: Some("Note".to_string()),
            is_announcement: false,
        };

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["legacyId"], "abc");
        assert_eq!(json["mills"], 1_700_000_000_000_i64);
        assert_eq!(json["text"], "hello");

        let back: Note = serde_json::from_value(json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_decomposed_record_id_and_kind() {
        let bolus = Bolus {
            header: header(),
            insulin: 1.5,
            programmed: None,
            delivered: None,
            bolus_type: None,
            automatic: false,
            duration: None,
            is_basal_insulin: false,
            insulin_type: None,
            sync_identifier: None,
        };
        let id = bolus.header.id;
        let decomposed = bolus.into_decomposed();

        assert_eq!(decomposed.id(), id);
        assert_eq!(decomposed.kind_name(), "bolus");
        assert!(decomposed.header().is_some());
    }
}

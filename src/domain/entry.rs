//! Legacy glucose entry record
//!
//! Entries are the CGM/meter side of the legacy dataset: `sgv` (sensor
//! glucose), `mbg` (meter glucose) and `cal` (sensor calibration) rows.

use serde::{Deserialize, Serialize};

/// Legacy entry record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, alias = "date")]
    pub mills: i64,

    /// `sgv`, `mbg` or `cal`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfiltered: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<i32>,
}

/// Known entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    SensorGlucose,
    MeterGlucose,
    Calibration,
}

impl Entry {
    /// Classifies the entry by its `type` field (case-insensitive)
    pub fn kind(&self) -> Option<EntryKind> {
        match self.entry_type.as_deref().map(|t| t.trim().to_lowercase()) {
            Some(t) if t == "sgv" => Some(EntryKind::SensorGlucose),
            Some(t) if t == "mbg" => Some(EntryKind::MeterGlucose),
            Some(t) if t == "cal" => Some(EntryKind::Calibration),
            _ => None,
        }
    }
}

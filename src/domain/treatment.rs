//! Legacy treatment record
//!
//! A `Treatment` is the flexible, sparsely-populated historical representation
//! of a clinical event as stored by Nightscout-compatible systems. No field is
//! guaranteed present for any given event type, so every field except the
//! timestamp is optional and the struct stays flat.

use serde::{Deserialize, Serialize};

/// Legacy treatment record
///
/// Deserializes from Nightscout camelCase JSON. `_id` is accepted as an alias
/// for `id` and `date` as an alias for `mills`.
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::domain::Treatment;
///
/// let treatment: Treatment = serde_json::from_str(
///     r#"{"_id":"abc","mills":1700000000000,"eventType":"Meal Bolus","insulin":4.0,"carbs":50}"#,
/// ).unwrap();
///
/// assert_eq!(treatment.id.as_deref(), Some("abc"));
/// assert_eq!(treatment.insulin, Some(4.0));
/// assert!(treatment.glucose.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Epoch milliseconds
    #[serde(default, alias = "date")]
    pub mills: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    // Insulin and carbs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absorption_time: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub bolus_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_basal_insulin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programmed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_delivered: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_now: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_ext: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_bolus: Option<f64>,

    // Glucose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgdl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmol: Option<f64>,

    /// Duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    // Free text and provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_identifier: Option<String>,
    /// Offset from UTC in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<i32>,

    // Profile switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeshift: Option<i32>,

    // Temp basal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,

    // Temporary override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_needs_scale_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_type: Option<String>,

    // Bolus calculator inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_glucose_input: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_glucose_input_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carb_input: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_on_board: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin_recommendation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carb_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_type: Option<String>,
}

impl Treatment {
    /// Creates a treatment with only the required minimum fields set
    pub fn new(id: Option<&str>, mills: i64, event_type: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            mills,
            event_type: event_type.map(str::to_string),
            ..Default::default()
        }
    }

    /// Event type with surrounding whitespace removed; blank becomes `None`
    pub fn trimmed_event_type(&self) -> Option<&str> {
        self.event_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Provenance used for derived records: data source, then entered-by
    pub fn source(&self) -> Option<&str> {
        self.data_source.as_deref().or(self.entered_by.as_deref())
    }
}

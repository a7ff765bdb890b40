//! Interval records
//!
//! A state span describes a state holding over `[start_mills, end_mills)`:
//! a temp basal rate, an active profile, a temporary override.

use crate::domain::ids::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a state span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateSpanCategory {
    TempBasal,
    Profile,
    Override,
    PumpMode,
}

impl StateSpanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TempBasal => "TempBasal",
            Self::Profile => "Profile",
            Self::Override => "Override",
            Self::PumpMode => "PumpMode",
        }
    }
}

impl fmt::Display for StateSpanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StateSpanCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TempBasal" => Ok(Self::TempBasal),
            "Profile" => Ok(Self::Profile),
            "Override" => Ok(Self::Override),
            "PumpMode" => Ok(Self::PumpMode),
            other => Err(format!("Unknown state span category: {other}")),
        }
    }
}

/// Interval entity
///
/// `end_mills` of `None` means the span is open-ended. `metadata` only holds
/// fields that were present on the source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSpan {
    pub id: RecordId,
    pub category: StateSpanCategory,
    pub state: String,
    pub start_mills: i64,
    pub end_mills: Option<i64>,
    pub source: String,
    pub original_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl StateSpan {
    /// Creates an open-ended span with empty metadata
    pub fn new(
        category: StateSpanCategory,
        state: impl Into<String>,
        start_mills: i64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            category,
            state: state.into(),
            start_mills,
            end_mills: None,
            source: source.into(),
            original_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Whether the span has no end
    pub fn is_open(&self) -> bool {
        self.end_mills.is_none()
    }

    /// Span length in milliseconds, if closed
    pub fn duration_mills(&self) -> Option<i64> {
        self.end_mills.map(|end| end - self.start_mills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_span_is_open() {
        let span = StateSpan::new(StateSpanCategory::Profile, "Active", 1000, "loop");
        assert!(span.is_open());
        assert_eq!(span.duration_mills(), None);
        assert!(span.metadata.is_empty());
    }

    #[test]
    fn test_duration_mills() {
        let mut span = StateSpan::new(StateSpanCategory::Override, "Custom", 1000, "loop");
        span.end_mills = Some(61_000);
        assert_eq!(span.duration_mills(), Some(60_000));
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            StateSpanCategory::TempBasal,
            StateSpanCategory::Profile,
            StateSpanCategory::Override,
            StateSpanCategory::PumpMode,
        ] {
            let parsed: StateSpanCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("Basal".parse::<StateSpanCategory>().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut span = StateSpan::new(StateSpanCategory::Profile, "Active", 5, "nightscout");
        span.original_id = Some("abc".to_string());
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["startMills"], 5);
        assert_eq!(json["originalId"], "abc");
        assert_eq!(json["category"], "Profile");
        assert!(json["endMills"].is_null());
    }
}

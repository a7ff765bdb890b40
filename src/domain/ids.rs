//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through decomposition, so a
//! legacy back-reference can never be confused with a generated record id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Legacy record identifier newtype wrapper
///
/// The `_id` of the source treatment or entry. It is the idempotency key for
/// target-record upserts, so it must never be empty.
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::domain::ids::LegacyId;
/// use std::str::FromStr;
///
/// let legacy_id = LegacyId::from_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
/// assert_eq!(legacy_id.as_str(), "65a1f0c2e4b0a1b2c3d4e5f6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegacyId(String);

impl LegacyId {
    /// Creates a new LegacyId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(LegacyId)` if the ID is non-blank, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Legacy ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Builds a LegacyId from an optional raw id, dropping blank values
    pub fn from_optional(id: Option<&str>) -> Option<Self> {
        id.and_then(|raw| Self::new(raw).ok())
    }

    /// Returns the legacy ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LegacyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for LegacyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generated identity of a target record or state span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a fresh random record id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing uuid
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid record id '{s}': {e}"))
    }
}

/// Identifier shared by every record produced by one decomposition call
///
/// Backed by a UUIDv7 so correlation ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generates a fresh time-ordered correlation id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing uuid
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_id_creation() {
        let id = LegacyId::new("abc").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(format!("{id}"), "abc");
    }

    #[test]
    fn test_legacy_id_empty_fails() {
        assert!(LegacyId::new("").is_err());
        assert!(LegacyId::new("   ").is_err());
    }

    #[test]
    fn test_legacy_id_from_optional() {
        assert_eq!(
            LegacyId::from_optional(Some("abc")),
            Some(LegacyId::new("abc").unwrap())
        );
        assert_eq!(LegacyId::from_optional(Some(" ")), None);
        assert_eq!(LegacyId::from_optional(None), None);
    }

    #[test]
    fn test_record_id_round_trip_through_str() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_correlation_ids_are_time_ordered() {
        let first = CorrelationId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = CorrelationId::new();
        assert!(first < second);
        assert_eq!(first.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_record_id_serializes_as_plain_uuid() {
        let uuid = Uuid::parse_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
        let json = serde_json::to_string(&RecordId::from_uuid(uuid)).unwrap();
        assert_eq!(json, "\"7d44b88c-4199-4bad-97dc-d78268e01398\"");
    }
}

//! Domain models and types for the decomposer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Legacy input records** ([`Treatment`], [`Entry`])
//! - **Typed target records** ([`Bolus`], [`CarbIntake`], [`BgCheck`], [`Note`],
//!   [`DeviceEvent`], [`BolusCalculation`] and the glucose entry records)
//! - **Interval records** ([`StateSpan`])
//! - **Strongly-typed identifiers** ([`LegacyId`], [`RecordId`], [`CorrelationId`])
//! - **Error types** ([`DecomposerError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes so a legacy back-reference can't be passed where a
//! generated record id is expected:
//!
//! ```rust
//! use nocturne_decomposer::domain::{LegacyId, RecordId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let legacy_id = LegacyId::new("65a1f0c2e4b0a1b2c3d4e5f6")?;
//! let record_id = RecordId::new();
//!
//! // let wrong: RecordId = legacy_id;  // Compile error!
//! # let _ = (legacy_id, record_id);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod entry;
pub mod errors;
pub mod ids;
pub mod records;
pub mod result;
pub mod state_span;
pub mod treatment;

pub use entry::{Entry, EntryKind};
pub use errors::{DecomposerError, RecordErrorDetail, StorageError};
pub use ids::{CorrelationId, LegacyId, RecordId};
pub use records::{
    BgCheck, Bolus, BolusCalculation, BolusType, CalculationType, Calibration, CarbIntake,
    DecomposedRecord, DeviceEvent, DeviceEventType, GlucoseType, GlucoseUnit, MeterGlucose, Note,
    RecordHeader, RecordKind, SensorGlucose, TargetRecord,
};
pub use result::Result;
pub use state_span::{StateSpan, StateSpanCategory};
pub use treatment::Treatment;

//! Classification and mapping of legacy records
//!
//! Everything here is pure: no storage access, no logging side effects.
//!
//! - [`classifier`] decides what a treatment becomes
//! - [`mapper`] builds the typed records
//! - [`parse`] turns free-text sub-fields into enums

pub mod classifier;
pub mod mapper;
pub mod parse;

pub use classifier::{classify, is_backfill_skipped, Classification, StateSpanDelegation};
pub use parse::{parse_lenient, LenientEnum};

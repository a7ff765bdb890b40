// nocturne-decomposer - legacy Nightscout record decomposition
// Licensed under the MIT License

//! # nocturne-decomposer
//!
//! Splits legacy Nightscout treatments and glucose entries into typed records
//! (boluses, carb intakes, BG checks, notes, device events, bolus calculations,
//! glucose readings) and state spans, and replays whole historical datasets
//! through the same path with a resumable backfill.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Classification, mapping, decomposition and backfill
//! - [`adapters`] - Storage (PostgreSQL and in-memory)
//! - [`domain`] - Legacy and target record types, identifiers, errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nocturne_decomposer::adapters::database::Backends;
//! use nocturne_decomposer::domain::Treatment;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backends = Backends::in_memory(Vec::new(), Vec::new());
//! let decomposer = backends.treatment_decomposer();
//!
//! let mut treatment = Treatment::new(Some("65a1f0c2"), 1_700_000_000_000, Some("Meal Bolus"));
//! treatment.insulin = Some(4.0);
//! treatment.carbs = Some(45.0);
//!
//! let result = decomposer.decompose(&treatment).await?;
//! println!("created {} records", result.created.len());
//! # Ok(())
//! # }
//! ```
//!
//! Re-running the same treatment updates the records in place; every record is
//! keyed by the legacy id it came from.
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], whose error is
//! [`domain::DecomposerError`]. The binary maps failures to exit codes.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

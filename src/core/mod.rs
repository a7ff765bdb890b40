//! Core decomposition logic.
//!
//! # Modules
//!
//! - [`transform`] - Event type classification and legacy-to-typed mapping
//! - [`decompose`] - Treatment and entry decomposers, idempotent upserts, state span delegation
//! - [`backfill`] - Cursor-paginated, resumable replay over the historical dataset
//!
//! # Decomposition Workflow
//!
//! 1. **Classify**: Resolve the event type to the set of target kinds
//! 2. **Map**: Build one typed record per kind, sharing a correlation id
//! 3. **Upsert**: Create or update each record keyed by its legacy id
//! 4. **Delegate**: Hand interval-valued events to the state span service
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nocturne_decomposer::adapters::memory::{InMemoryRepositories, InMemoryStateSpanService};
//! use nocturne_decomposer::core::decompose::{StateSpanDelegate, TreatmentDecomposer, UpsertCoordinator};
//! use nocturne_decomposer::domain::Treatment;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let memory = InMemoryRepositories::new();
//! let decomposer = TreatmentDecomposer::new(
//!     UpsertCoordinator::new(memory.repositories()),
//!     StateSpanDelegate::new(Arc::new(InMemoryStateSpanService::new())),
//! );
//!
//! let mut treatment = Treatment::new(Some("t1"), 1_700_000_000_000, Some("Meal Bolus"));
//! treatment.insulin = Some(5.0);
//! treatment.carbs = Some(45.0);
//!
//! let result = decomposer.decompose(&treatment).await?;
//! println!("Created {} records", result.created.len());
//! # Ok(())
//! # }
//! ```

pub mod backfill;
pub mod decompose;
pub mod transform;

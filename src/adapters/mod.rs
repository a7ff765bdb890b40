//! Storage integrations.
//!
//! - [`database`] - Storage traits and backend construction
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-process implementation used for dry runs and tests
//!
//! Every backend implements the traits in [`database::traits`]; the decomposers
//! only ever see `Arc<dyn ...>` handles, so Postgres and in-memory storage are
//! interchangeable.

pub mod database;
pub mod memory;
pub mod postgresql;

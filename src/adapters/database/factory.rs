//! Backend construction
//!
//! Wires storage trait objects from configuration. A dry run keeps reading
//! the historical dataset from PostgreSQL but writes target records, spans
//! and checkpoints to memory.

use crate::adapters::database::traits::{CheckpointStorage, HistoricalStore, StateSpanService};
use crate::adapters::memory::{
    InMemoryCheckpointStorage, InMemoryHistoricalStore, InMemoryRepositories,
    InMemoryStateSpanService,
};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::DecomposerConfig;
use crate::core::decompose::{
    EntryDecomposer, Repositories, StateSpanDelegate, TreatmentDecomposer, UpsertCoordinator,
};
use crate::domain::entry::Entry;
use crate::domain::treatment::Treatment;
use crate::domain::Result;
use std::sync::Arc;

/// Every storage collaborator the decomposers and the backfill driver need
#[derive(Clone)]
pub struct Backends {
    pub repositories: Repositories,
    pub state_spans: Arc<dyn StateSpanService>,
    pub treatments: Arc<dyn HistoricalStore<Treatment>>,
    pub entries: Arc<dyn HistoricalStore<Entry>>,
    pub checkpoints: Arc<dyn CheckpointStorage>,

    /// Typed view of the repositories when writes go to memory
    pub memory: Option<InMemoryRepositories>,
}

impl Backends {
    /// Fully in-memory backends over the given historical rows
    pub fn in_memory(treatments: Vec<Treatment>, entries: Vec<Entry>) -> Self {
        let memory = InMemoryRepositories::new();
        Self {
            repositories: memory.repositories(),
            state_spans: Arc::new(InMemoryStateSpanService::new()),
            treatments: Arc::new(InMemoryHistoricalStore::new(treatments)),
            entries: Arc::new(InMemoryHistoricalStore::new(entries)),
            checkpoints: Arc::new(InMemoryCheckpointStorage::new()),
            memory: Some(memory),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.memory.is_some()
    }

    pub fn treatment_decomposer(&self) -> TreatmentDecomposer {
        TreatmentDecomposer::new(
            UpsertCoordinator::new(self.repositories.clone()),
            StateSpanDelegate::new(self.state_spans.clone()),
        )
    }

    pub fn entry_decomposer(&self) -> EntryDecomposer {
        EntryDecomposer::new(UpsertCoordinator::new(self.repositories.clone()))
    }
}

/// Connect to PostgreSQL and verify the connection
///
/// # Errors
///
/// Returns an error if the pool cannot be built or the test query fails
pub async fn create_postgres_adapter(config: &DecomposerConfig) -> Result<PostgreSQLAdapter> {
    tracing::info!("Creating PostgreSQL client");
    let client = PostgreSQLClient::new(config.postgresql.clone())?;
    client.test_connection().await?;
    Ok(PostgreSQLAdapter::new(client))
}

/// Build backends from configuration
///
/// With `dry_run` the schema is left untouched and only the historical
/// stores come from PostgreSQL.
///
/// # Errors
///
/// Returns an error if PostgreSQL is unreachable or the schema cannot be applied
pub async fn create_backends(config: &DecomposerConfig, dry_run: bool) -> Result<Backends> {
    let adapter = create_postgres_adapter(config).await?;

    if dry_run {
        tracing::info!("DRY RUN: target records will be written to memory only");
        let memory = InMemoryRepositories::new();
        return Ok(Backends {
            repositories: memory.repositories(),
            state_spans: Arc::new(InMemoryStateSpanService::new()),
            treatments: adapter.treatments(),
            entries: adapter.entries(),
            checkpoints: Arc::new(InMemoryCheckpointStorage::new()),
            memory: Some(memory),
        });
    }

    adapter.client().ensure_schema().await?;

    Ok(Backends {
        repositories: adapter.repositories(),
        state_spans: adapter.state_spans(),
        treatments: adapter.treatments(),
        entries: adapter.entries(),
        checkpoints: adapter.checkpoints(),
        memory: None,
    })
}

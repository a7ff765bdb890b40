//! Decompose command implementation
//!
//! Decomposes legacy records from a JSON file, either a single object or an
//! array, and prints the resulting records.

use crate::adapters::database::{create_backends, Backends};
use crate::config::load_config;
use crate::core::decompose::DecompositionResult;
use crate::domain::entry::Entry;
use crate::domain::treatment::Treatment;
use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Legacy record type held in the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RecordSource {
    #[default]
    Treatment,
    Entry,
}

/// Arguments for the decompose command
#[derive(Args, Debug)]
pub struct DecomposeArgs {
    /// JSON file with one legacy record or an array of them
    #[arg(short, long)]
    pub file: PathBuf,

    /// Record type in the file
    #[arg(long, value_enum, default_value_t = RecordSource::Treatment)]
    pub kind: RecordSource,

    /// Decompose into memory only; no configuration or database needed
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Read one record or an array of records
pub(crate) fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(match serde_json::from_str::<OneOrMany<T>>(&contents)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    })
}

impl DecomposeArgs {
    /// Execute the decompose command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), kind = ?self.kind, "Decomposing file");

        let backends = if self.dry_run {
            Backends::in_memory(Vec::new(), Vec::new())
        } else {
            let config = match load_config(config_path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load configuration: {e}");
                    return Ok(2);
                }
            };
            match create_backends(&config, false).await {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Failed to initialize storage: {e}");
                    return Ok(4);
                }
            }
        };

        let outcomes = match self.kind {
            RecordSource::Treatment => {
                let records: Vec<Treatment> = match read_records(&self.file) {
                    Ok(r) => r,
                    Err(e) => {
                        eprintln!("Failed to read {}: {e}", self.file.display());
                        return Ok(2);
                    }
                };
                let decomposer = backends.treatment_decomposer();
                let mut outcomes = Vec::with_capacity(records.len());
                for record in &records {
                    outcomes.push((record.id.clone(), decomposer.decompose(record).await));
                }
                outcomes
            }
            RecordSource::Entry => {
                let records: Vec<Entry> = match read_records(&self.file) {
                    Ok(r) => r,
                    Err(e) => {
                        eprintln!("Failed to read {}: {e}", self.file.display());
                        return Ok(2);
                    }
                };
                let decomposer = backends.entry_decomposer();
                let mut outcomes = Vec::with_capacity(records.len());
                for record in &records {
                    outcomes.push((record.id.clone(), decomposer.decompose(record).await));
                }
                outcomes
            }
        };

        let mut results: Vec<DecompositionResult> = Vec::new();
        let mut failed = 0usize;
        for (legacy_id, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    failed += 1;
                    tracing::error!(legacy_id = ?legacy_id, error = %e, "Decomposition failed");
                    eprintln!(
                        "Failed to decompose {}: {e}",
                        legacy_id.as_deref().unwrap_or("<no id>")
                    );
                }
            }
        }

        println!("{}", serde_json::to_string_pretty(&results)?);

        Ok(if failed > 0 { 1 } else { 0 })
    }
}

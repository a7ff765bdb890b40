//! Backfill command implementation
//!
//! Replays decomposition over every historical entry and treatment.

use crate::adapters::database::create_backends;
use crate::config::load_config;
use crate::core::backfill::{BackfillDriver, BackfillOptions, BackfillResult};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the backfill command
#[derive(Args, Debug, Default)]
pub struct BackfillArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Decompose into memory without writing target tables
    #[arg(long)]
    pub dry_run: bool,

    /// Override rows per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Resume unfinished passes from their checkpoints
    #[arg(long)]
    pub resume: bool,

    /// Skip the entries pass
    #[arg(long)]
    pub no_entries: bool,
}

impl BackfillArgs {
    /// Execute the backfill command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting backfill command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding batch size from CLI");
            config.backfill.batch_size = batch_size;
        }
        if self.resume {
            config.backfill.resume = true;
        }
        if self.no_entries {
            config.backfill.include_entries = false;
        }
        let dry_run = self.dry_run || config.application.dry_run;

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if dry_run {
            println!("🔍 DRY RUN MODE - target tables will not be written");
            println!();
        }

        if !self.yes && !dry_run {
            println!("Backfill Configuration:");
            println!("  Batch size: {}", config.backfill.batch_size);
            println!("  Entries pass: {}", config.backfill.include_entries);
            println!("  Resume: {}", config.backfill.resume);
            println!();
            print!("Proceed with backfill? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Backfill cancelled.");
                return Ok(0);
            }
        }

        let backends = match create_backends(&config, dry_run).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize storage");
                eprintln!("Failed to initialize storage: {e}");
                return Ok(4);
            }
        };

        let driver = BackfillDriver::new(
            backends.treatments.clone(),
            backends.entries.clone(),
            backends.treatment_decomposer(),
            backends.entry_decomposer(),
            BackfillOptions::from(&config.backfill),
            shutdown_signal,
        )
        .with_checkpoints(backends.checkpoints.clone());

        println!("🚀 Starting backfill...");
        println!();

        let result = match driver.backfill().await {
            Ok(r) => r,
            Err(e) => {
                crate::log_error_with_context!(&e, "Backfill failed");
                eprintln!("Backfill failed: {e}");
                return Ok(5);
            }
        };

        print_summary(&result);
        if let Some(memory) = &backends.memory {
            println!("  Records held in memory: {}", memory.total_rows()?);
            println!();
        }

        Ok(exit_code(&result))
    }
}

fn print_summary(result: &BackfillResult) {
    println!();
    println!("📊 Backfill Summary:");
    println!(
        "  Entries: {} processed, {} failed ({} batches)",
        result.entries_processed, result.entries_failed, result.entries_batches
    );
    println!(
        "  Treatments: {} processed, {} failed, {} skipped ({} batches)",
        result.treatments_processed,
        result.treatments_failed,
        result.treatments_skipped,
        result.treatments_batches
    );
    println!("  Duration: {:.2}s", result.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", result.success_rate());
    println!();

    if !result.errors.is_empty() {
        println!("⚠️  Failed records:");
        for error in result.errors.iter().take(10) {
            println!(
                "  - [{}] {} ({}): {}",
                error.pass,
                error.detail.legacy_id.as_deref().unwrap_or("<no id>"),
                error.detail.record_type.as_deref().unwrap_or("<no type>"),
                error.detail.message
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more", result.total_failed() - 10);
        }
        println!();
    }
}

fn exit_code(result: &BackfillResult) -> i32 {
    if result.cancelled {
        println!("⚠️  Backfill interrupted. Progress saved.");
        println!("   Run again with --resume to continue from the checkpoint.");
        tracing::info!("Backfill interrupted by user signal");
        130
    } else if result.is_successful() {
        println!("✅ Backfill completed successfully!");
        0
    } else {
        println!("⚠️  Backfill completed with failures");
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_args_defaults() {
        let args = BackfillArgs::default();
        assert!(!args.yes);
        assert!(!args.dry_run);
        assert!(args.batch_size.is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&BackfillResult::new()), 0);

        let cancelled = BackfillResult {
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(exit_code(&cancelled), 130);

        let partial = BackfillResult {
            treatments_processed: 9,
            treatments_failed: 1,
            ..Default::default()
        };
        assert_eq!(exit_code(&partial), 1);
    }
}

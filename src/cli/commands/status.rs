//! Status command implementation
//!
//! Shows the stored backfill checkpoints.

use crate::adapters::database::create_postgres_adapter;
use crate::config::load_config;
use crate::core::backfill::{BackfillCheckpoint, BackfillPass, CheckpointStatus};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only show this pass (entries or treatments)
    #[arg(long)]
    pub pass: Option<BackfillPass>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking backfill status");

        println!("📊 Backfill Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let adapter = match create_postgres_adapter(&config).await {
            Ok(a) => a,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let checkpoints = match adapter.checkpoints().get_all_checkpoints().await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load checkpoints");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        let filtered: Vec<_> = checkpoints
            .iter()
            .filter(|c| self.pass.map_or(true, |pass| c.pass == pass))
            .collect();

        if filtered.is_empty() {
            println!("No backfill history found.");
            println!("Run 'nocturne-decomposer backfill' to start.");
            return Ok(0);
        }

        println!(
            "{:<12} {:<16} {:<12} {:<40} {:<20}",
            "Pass", "Status", "Scanned", "Cursor", "Completed"
        );
        println!("{}", "-".repeat(100));
        for checkpoint in filtered {
            println!("{}", format_row(checkpoint));
        }
        println!();

        Ok(0)
    }
}

fn status_label(status: CheckpointStatus) -> &'static str {
    match status {
        CheckpointStatus::Completed => "✅ Completed",
        CheckpointStatus::InProgress => "🔄 In Progress",
        CheckpointStatus::Interrupted => "⏸️  Interrupted",
        CheckpointStatus::Failed => "❌ Failed",
        CheckpointStatus::NotStarted => "Not Started",
    }
}

fn format_row(checkpoint: &BackfillCheckpoint) -> String {
    let cursor = checkpoint
        .cursor
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let completed = checkpoint
        .completed_at
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

    format!(
        "{:<12} {:<16} {:<12} {:<40} {:<20}",
        checkpoint.pass.as_str(),
        status_label(checkpoint.status),
        checkpoint.records_scanned,
        cursor,
        completed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backfill::{BackfillCheckpointBuilder, Cursor};
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: StatusArgs,
    }

    #[test]
    fn test_pass_filter_parses() {
        let parsed = Harness::parse_from(["status", "--pass", "entries"]);
        assert_eq!(parsed.args.pass, Some(BackfillPass::Entries));
    }

    #[test]
    fn test_format_row() {
        let checkpoint = BackfillCheckpointBuilder::new(BackfillPass::Treatments)
            .cursor(Cursor::new(1700, "abc"))
            .records_scanned(2500)
            .status(CheckpointStatus::Interrupted)
            .build();

        let row = format_row(&checkpoint);
        assert!(row.starts_with("treatments"));
        assert!(row.contains("2500"));
        assert!(row.contains("Interrupted"));
    }
}

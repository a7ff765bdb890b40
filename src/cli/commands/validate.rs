//! Validate config command implementation

use crate::config::{load_config, redacted_connection_string};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates, so a load failure is reported as invalid.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  PostgreSQL: {}",
            redacted_connection_string(&config.postgresql.connection_string)
        );
        println!("  SSL Mode: {}", config.postgresql.ssl_mode);
        println!("  Max Connections: {}", config.postgresql.max_connections);
        println!(
            "  Legacy Tables: {}, {}",
            config.postgresql.treatments_table, config.postgresql.entries_table
        );
        println!("  Batch Size: {}", config.backfill.batch_size);
        println!("  Entries Pass: {}", config.backfill.include_entries);
        println!("  Resume: {}", config.backfill.resume);
        println!("  Checkpointing: {}", config.backfill.enable_checkpointing);
        println!();
        Ok(0)
    }
}

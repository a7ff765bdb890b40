//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// nocturne-decomposer - split legacy Nightscout records into typed records
#[derive(Parser, Debug)]
#[command(name = "nocturne-decomposer")]
#[command(version, about, long_about = None)]
#[command(author = "Nocturne Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nocturne.toml", env = "NOCTURNE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "NOCTURNE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompose every historical entry and treatment
    Backfill(commands::backfill::BackfillArgs),

    /// Decompose records from a JSON file
    Decompose(commands::decompose::DecomposeArgs),

    /// Show backfill checkpoints
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::decompose::RecordSource;

    #[test]
    fn test_cli_parse_backfill() {
        let cli = Cli::parse_from(["nocturne-decomposer", "backfill"]);
        assert_eq!(cli.config, "nocturne.toml");
        assert!(matches!(cli.command, Commands::Backfill(_)));
    }

    #[test]
    fn test_cli_parse_backfill_overrides() {
        let cli = Cli::parse_from([
            "nocturne-decomposer",
            "backfill",
            "--batch-size",
            "500",
            "--resume",
            "--no-entries",
        ]);
        let Commands::Backfill(args) = cli.command else {
            panic!("expected backfill");
        };
        assert_eq!(args.batch_size, Some(500));
        assert!(args.resume);
        assert!(args.no_entries);
    }

    #[test]
    fn test_cli_parse_decompose() {
        let cli = Cli::parse_from([
            "nocturne-decomposer",
            "decompose",
            "--file",
            "records.json",
            "--kind",
            "entry",
            "--dry-run",
        ]);
        let Commands::Decompose(args) = cli.command else {
            panic!("expected decompose");
        };
        assert_eq!(args.kind, RecordSource::Entry);
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["nocturne-decomposer", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["nocturne-decomposer", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["nocturne-decomposer", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }
}

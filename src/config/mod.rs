//! Configuration management
//!
//! TOML configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `NOCTURNE_<SECTION>_<KEY>` environment overrides
//! - Defaults for every optional setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nocturne_decomposer::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("nocturne.toml")?;
//! println!("Batch size: {}", config.backfill.batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry run
//! - [`PostgreSQLConfig`] - Connection, pool and legacy table names
//! - [`BackfillConfig`] - Batch size, entries pass, resume, checkpointing
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${NOCTURNE_DATABASE_URL}"
//! ssl_mode = "require"
//!
//! [backfill]
//! batch_size = 1000
//! resume = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BackfillConfig, DecomposerConfig, LoggingConfig, PostgreSQLConfig,
};
pub use secret::{redacted_connection_string, secret_string, SecretString, SecretValue};

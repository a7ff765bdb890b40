//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::DecomposerConfig;
use super::secret::secret_string;
use crate::domain::errors::DecomposerError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex"));

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DecomposerConfig
/// 4. Applies environment variable overrides (NOCTURNE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use nocturne_decomposer::config::loader::load_config;
///
/// let config = load_config("nocturne.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DecomposerConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DecomposerError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DecomposerError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from TOML text
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<DecomposerConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: DecomposerConfig = toml::from_str(&contents)
        .map_err(|e| DecomposerError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        DecomposerError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = ENV_VAR_PATTERN.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(DecomposerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using the NOCTURNE_* prefix
///
/// Variables follow the pattern `NOCTURNE_<SECTION>_<KEY>`, for example
/// `NOCTURNE_BACKFILL_BATCH_SIZE`. Unparseable values are ignored.
fn apply_env_overrides(config: &mut DecomposerConfig) {
    // Application
    if let Ok(val) = std::env::var("NOCTURNE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_bool("NOCTURNE_APPLICATION_DRY_RUN") {
        config.application.dry_run = val;
    }

    // PostgreSQL
    if let Ok(val) = std::env::var("NOCTURNE_POSTGRESQL_CONNECTION_STRING") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = std::env::var("NOCTURNE_POSTGRESQL_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.postgresql.max_connections = val;
    }
    if let Ok(val) = std::env::var("NOCTURNE_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Backfill
    if let Some(val) = std::env::var("NOCTURNE_BACKFILL_BATCH_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.backfill.batch_size = val;
    }
    if let Some(val) = env_bool("NOCTURNE_BACKFILL_INCLUDE_ENTRIES") {
        config.backfill.include_entries = val;
    }
    if let Some(val) = env_bool("NOCTURNE_BACKFILL_RESUME") {
        config.backfill.resume = val;
    }
    if let Some(val) = env_bool("NOCTURNE_BACKFILL_ENABLE_CHECKPOINTING") {
        config.backfill.enable_checkpointing = val;
    }

    // Logging
    if let Some(val) = env_bool("NOCTURNE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("NOCTURNE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted logs
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use nocturne_decomposer::logging::init_logging;
//! use nocturne_decomposer::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a create or update decision for a target record
///
/// # Example
///
/// ```no_run
/// use nocturne_decomposer::log_decomposition;
/// use nocturne_decomposer::domain::RecordId;
///
/// let id = RecordId::new();
/// log_decomposition!("created", "bolus", id, Some("abc"));
/// ```
#[macro_export]
macro_rules! log_decomposition {
    ($action:expr, $kind:expr, $record_id:expr, $legacy_id:expr) => {
        tracing::debug!(
            action = $action,
            kind = %$kind,
            record_id = %$record_id,
            legacy_id = ?$legacy_id,
            "Target record {}",
            $action
        );
    };
}

/// Log backfill progress after a batch
///
/// # Example
///
/// ```no_run
/// use nocturne_decomposer::log_batch_progress;
///
/// log_batch_progress!("treatments", 1000_u64, 2500_u64);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($pass:expr, $processed:expr, $total:expr) => {
        tracing::info!(
            pass = %$pass,
            processed = $processed,
            total = $total,
            progress_pct = if $total == 0 {
                100.0
            } else {
                $processed as f64 / $total as f64 * 100.0
            },
            "Backfill {}: processed {}/{}",
            $pass,
            $processed,
            $total
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use nocturne_decomposer::log_error_with_context;
/// use nocturne_decomposer::domain::DecomposerError;
///
/// let error = DecomposerError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

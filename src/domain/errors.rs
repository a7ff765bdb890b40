//! Domain error types
//!
//! This module defines the error hierarchy for the decomposer. Errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main decomposer error type
///
/// This is the primary error type used throughout the crate. It wraps
/// storage errors and provides context for error handling.
#[derive(Debug, Error)]
pub enum DecomposerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage-related errors (repositories, historical stores, checkpoints)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// State span service errors
    #[error("State span error: {0}")]
    StateSpan(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backfill run errors (store-level, never per-record)
    #[error("Backfill error: {0}")]
    Backfill(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Storage-specific errors
///
/// Errors raised by record repositories, the state span store, historical
/// stores and checkpoint storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to connect to the database
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Failed to insert a row
    #[error("Failed to insert {kind}: {message}")]
    InsertFailed { kind: String, message: String },

    /// Failed to update a row
    #[error("Failed to update {kind}: {message}")]
    UpdateFailed { kind: String, message: String },

    /// Row to update does not exist
    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: String, id: String },

    /// Uniqueness violation on (kind, legacy_id)
    #[error("Conflict on {kind} legacy id {legacy_id}")]
    Conflict { kind: String, legacy_id: String },

    /// Stored payload could not be decoded
    #[error("Failed to deserialize stored row: {0}")]
    DeserializationFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Context for a record that failed during a backfill pass
#[derive(Debug, Clone)]
pub struct RecordErrorDetail {
    /// Legacy identifier of the failing record, when present
    pub legacy_id: Option<String>,

    /// Event type (treatments) or entry type (entries)
    pub record_type: Option<String>,

    /// Record timestamp
    pub mills: i64,

    /// Error message
    pub message: String,
}

impl RecordErrorDetail {
    /// Creates a new record error detail
    pub fn new(mills: i64, message: impl Into<String>) -> Self {
        Self {
            legacy_id: None,
            record_type: None,
            mills,
            message: message.into(),
        }
    }

    /// Sets the legacy id
    pub fn with_legacy_id(mut self, legacy_id: Option<&str>) -> Self {
        self.legacy_id = legacy_id.map(str::to_string);
        self
    }

    /// Sets the record type
    pub fn with_record_type(mut self, record_type: Option<&str>) -> Self {
        self.record_type = record_type.map(str::to_string);
        self
    }
}

impl From<std::io::Error> for DecomposerError {
    fn from(err: std::io::Error) -> Self {
        DecomposerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DecomposerError {
    fn from(err: serde_json::Error) -> Self {
        DecomposerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DecomposerError {
    fn from(err: toml::de::Error) -> Self {
        DecomposerError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for DecomposerError {
    fn from(err: tokio_postgres::Error) -> Self {
        DecomposerError::Storage(StorageError::QueryFailed(err.to_string()))
    }
}

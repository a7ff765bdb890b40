//! PostgreSQL connection pool

use crate::config::{redacted_connection_string, PostgreSQLConfig};
use crate::domain::errors::StorageError;
use crate::domain::{DecomposerError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

const MIGRATION_SQL: &str = include_str!("../../../migrations/001_initial_schema.sql");

/// Pooled PostgreSQL client
///
/// The statement timeout is applied per connection through startup options,
/// so every query on a pooled connection is bounded.
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create the pool
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable connection string or
    /// TLS setup failure.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        let mut pg_config: tokio_postgres::Config =
            config.connection_string.expose_secret().parse().map_err(|e| {
                DecomposerError::Configuration(format!(
                    "Invalid PostgreSQL connection string: {e}"
                ))
            })?;
        pg_config.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds * 1000
        ));
        pg_config.connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.requires_tls() {
            Manager::from_config(pg_config, tls_connector(&config.ssl_mode)?, manager_config)
        } else {
            Manager::from_config(pg_config, NoTls, manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                StorageError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        tracing::debug!(
            target_db = %redacted_connection_string(&config.connection_string),
            max_connections = config.max_connections,
            ssl_mode = %config.ssl_mode,
            "PostgreSQL pool created"
        );

        Ok(Self { pool, config })
    }

    /// Run `SELECT 1` on a pooled connection
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        tracing::info!(
            target_db = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Create target, state span and checkpoint tables if missing
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MigrationFailed` if the schema script fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .batch_execute(MIGRATION_SQL)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| {
            StorageError::ConnectionFailed(format!("Failed to get connection from pool: {e}"))
                .into()
        })
    }

    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        Ok(client.query(query, params).await?)
    }

    pub async fn query_opt(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.get_connection().await?;
        Ok(client.query_opt(query, params).await?)
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;
        Ok(client.execute(statement, params).await?)
    }

    /// Connection string with credentials redacted
    pub fn connection_string_safe(&self) -> String {
        redacted_connection_string(&self.config.connection_string)
    }

    pub fn config(&self) -> &PostgreSQLConfig {
        &self.config
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// TLS connector honoring libpq `sslmode` verification levels
fn tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = TlsConnector::builder();
    match ssl_mode {
        "require" => {
            builder.danger_accept_invalid_certs(true);
        }
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {}
    }

    let connector = builder
        .build()
        .map_err(|e| DecomposerError::Configuration(format!("Failed to build TLS connector: {e}")))?;
    Ok(MakeTlsConnector::new(connector))
}

//! SQLite connection handling.
//!
//! # Connection Modes
//! - File-based: `sqlite:///path/to/database.db` or `sqlite://./relative.db`
//! - Bare file path ending in `.db`, `.sqlite` or `.sqlite3`
//! - In-memory: `sqlite::memory:` or `:memory:`
//!
//! File databases are opened read-only.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::SqliteInspector;
use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::SchemaNestError;

impl SqliteInspector {
    /// Creates a new SQLite inspector from a connection string.
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Database file does not exist
    /// - Database cannot be opened
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_sqlite_connection_config(connection_string)?;
        let pool = create_sqlite_connection(connection_string, &config).await?;

        tracing::debug!("Opened SQLite database {}", config);
        Ok(Self { pool, config })
    }

    /// Wraps an already open pool.
    ///
    /// Useful for in-memory databases, which exist only on the connection
    /// that created them.
    pub fn from_pool(pool: SqlitePool, config: ConnectionConfig) -> Self {
        Self { pool, config }
    }

    /// Closes the connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Parses SQLite connection string to extract configuration parameters.
///
/// # Errors
/// Returns error if the connection string is not a SQLite location
pub fn parse_sqlite_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_sqlite_connection_string(connection_string)?;

    let mut config = ConnectionConfig::new("localhost".to_string())
        .with_database(extract_database_name(connection_string))
        .with_max_connections(1);
    config.port = None;
    // In-memory databases cannot be opened read-only
    config.read_only = !is_in_memory(connection_string);

    Ok(config)
}

/// Validates SQLite connection string format.
///
/// # Errors
/// Returns error if connection string is invalid
pub fn validate_sqlite_connection_string(connection_string: &str) -> Result<()> {
    if connection_string == ":memory:" {
        return Ok(());
    }

    if connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        return Ok(());
    }

    if let Some(rest) = connection_string.strip_prefix("sqlite:")
        && !rest.is_empty()
    {
        return Ok(());
    }

    Err(SchemaNestError::configuration(
        "Invalid SQLite connection string format: expected sqlite:// URL, file path, or :memory:",
    ))
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

/// Extracts database name from connection string.
fn extract_database_name(connection_string: &str) -> String {
    if is_in_memory(connection_string) {
        return ":memory:".to_string();
    }

    let path = connection_string
        .strip_prefix("sqlite://")
        .or_else(|| connection_string.strip_prefix("sqlite:"))
        .unwrap_or(connection_string);
    let path = path.split('?').next().unwrap_or(path);

    match path.rsplit('/').next() {
        Some(filename) if !filename.is_empty() => filename.to_string(),
        _ => "main".to_string(),
    }
}

/// Normalizes connection string to SQLite URL format.
fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }

    format!("sqlite://{}", connection_string)
}

async fn create_sqlite_connection(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<SqlitePool> {
    let normalized = normalize_connection_string(connection_string);

    let mut options = SqliteConnectOptions::from_str(&normalized).map_err(|e| {
        SchemaNestError::configuration(format!("Invalid SQLite connection string: {}", e))
    })?;

    if config.read_only {
        options = options.read_only(true);
    }

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await
        .map_err(|e| SchemaNestError::Connection {
            context: format!("Failed to open SQLite database {}", config),
            source: Box::new(e),
        })
}

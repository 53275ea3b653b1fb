//! Schema inspectors: read-only catalog access per database engine.
//!
//! Each engine implements [`SchemaInspector`], turning its catalog views into
//! typed [`SchemaCatalog`] values. [`inspect_catalog`] fans out over the
//! selected schemas and assembles the full [`Catalog`].
//!
//! # Module Structure
//! - `helpers`: typed row access and query error mapping
//! - `postgres`: `information_schema` and `pg_catalog` (feature `postgresql`)
//! - `sqlite`: `sqlite_master` and table-valued pragmas (feature `sqlite`)
//!
//! # Security Guarantees
//! - Metadata queries only; no table rows are ever read
//! - Connections are read-only where the engine supports it
//! - Connection strings are redacted in every log line and error

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};

use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::SchemaNestError;
use crate::models::{Catalog, DatabaseType, SchemaCatalog};

#[cfg(any(feature = "postgresql", feature = "sqlite"))]
pub mod helpers;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Catalog queries issued per schema; bounds the per-schema timeout.
const QUERIES_PER_SCHEMA: u32 = 4;

/// Read-only access to a database's structural metadata.
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn SchemaInspector>`.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Tests the database connection and catalog visibility.
    ///
    /// # Errors
    /// Returns error if the connection fails or catalog views are not readable
    async fn test_connection(&self) -> Result<()>;

    /// Lists user schemas visible to this connection, sorted by name.
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// Reads every table of `schema` with its columns, primary key and
    /// declared foreign keys.
    ///
    /// A schema that does not exist yields an empty [`SchemaCatalog`] and a
    /// logged warning, not an error.
    ///
    /// # Errors
    /// Returns error if any catalog query fails
    async fn inspect_schema(&self, schema: &str) -> Result<SchemaCatalog>;

    fn database_type(&self) -> DatabaseType;

    /// Gets the connection configuration (credentials sanitized).
    fn connection_config(&self) -> ConnectionConfig;
}

/// Inspects every selected schema and assembles the catalog.
///
/// Schemas are read concurrently, at most `max_concurrent` at a time. Each
/// schema is bounded by a timeout derived from the connection's query
/// timeout. The first failure aborts the whole call; nothing partial is
/// returned.
///
/// # Errors
/// [`SchemaNestError::MetadataAccess`] naming the schema that failed.
pub async fn inspect_catalog(
    inspector: &dyn SchemaInspector,
    schemas: &[String],
    max_concurrent: usize,
) -> Result<Catalog> {
    let timeout = schema_timeout(&inspector.connection_config());

    tracing::info!(
        "Inspecting {} schema(s) on {} (concurrency {})",
        schemas.len(),
        inspector.database_type(),
        max_concurrent
    );

    let inspected: Vec<SchemaCatalog> = stream::iter(schemas.iter().cloned())
        .map(|schema| async move {
            tracing::debug!("Inspecting schema '{}'", schema);
            match tokio::time::timeout(timeout, inspector.inspect_schema(&schema)).await {
                Ok(Ok(catalog)) => {
                    tracing::debug!(
                        "Schema '{}' has {} table(s)",
                        schema,
                        catalog.tables.len()
                    );
                    Ok(catalog)
                }
                Ok(Err(error @ SchemaNestError::MetadataAccess { .. })) => Err(error),
                Ok(Err(error)) => {
                    tracing::error!("Failed to inspect schema '{}': {}", schema, error);
                    Err(SchemaNestError::metadata_access(schema, error))
                }
                Err(elapsed) => {
                    tracing::error!(
                        "Inspection of schema '{}' timed out after {:?}",
                        schema,
                        timeout
                    );
                    Err(SchemaNestError::metadata_access(schema, elapsed))
                }
            }
        })
        .buffered(max_concurrent.max(1))
        .try_collect()
        .await?;

    let mut catalog = Catalog::new();
    for schema in inspected {
        catalog.insert_schema(schema);
    }

    tracing::info!(
        "Inspected {} table(s) across {} schema(s)",
        catalog.table_count(),
        catalog.schemas.len()
    );

    Ok(catalog)
}

fn schema_timeout(config: &ConnectionConfig) -> Duration {
    config.query_timeout.saturating_mul(QUERIES_PER_SCHEMA)
}

/// Factory function to create an inspector based on the connection string.
///
/// # Errors
/// Returns error if:
/// - Connection string format is invalid
/// - Database type is not supported
/// - Required features are not compiled in
pub async fn create_inspector(connection_string: &str) -> Result<Box<dyn SchemaInspector>> {
    let database_type = detect_database_type(connection_string)?;

    tracing::debug!(
        "Creating {} inspector for {}",
        database_type,
        crate::error::redact_database_url(connection_string)
    );

    match database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => {
            let inspector = postgres::PostgresInspector::new(connection_string).await?;
            Ok(Box::new(inspector))
        }
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(SchemaNestError::unsupported_feature(
            "PostgreSQL inspector",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            let inspector = sqlite::SqliteInspector::new(connection_string).await?;
            Ok(Box::new(inspector))
        }
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => Err(SchemaNestError::unsupported_feature(
            "SQLite inspector",
            "Compile with --features sqlite to enable SQLite support",
        )),
    }
}

/// Detects database type from connection string.
///
/// # Errors
/// Returns error if connection string format is unrecognized
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    if connection_string.starts_with("postgres://")
        || connection_string.starts_with("postgresql://")
    {
        Ok(DatabaseType::PostgreSQL)
    } else if connection_string.starts_with("sqlite:")
        || connection_string == ":memory:"
        || connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        Ok(DatabaseType::SQLite)
    } else {
        Err(SchemaNestError::configuration(format!(
            "Unsupported database type in connection string: {}",
            crate::error::redact_database_url(connection_string)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Table, TableId};
    use std::collections::HashSet;

    #[test]
    fn test_detect_database_type() {
        assert_eq!(
            detect_database_type("postgres://localhost/db").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            detect_database_type("postgresql://u:p@localhost/db").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            detect_database_type("sqlite::memory:").unwrap(),
            DatabaseType::SQLite
        );
        assert_eq!(
            detect_database_type("/var/lib/app.db").unwrap(),
            DatabaseType::SQLite
        );
        assert!(detect_database_type("mysql://localhost/db").is_err());
    }

    #[test]
    fn test_unsupported_url_is_redacted() {
        let error = detect_database_type("oracle://scott:tiger@db/orcl").unwrap_err();
        assert!(!error.to_string().contains("tiger"));
    }

    /// In-memory inspector for exercising the fan-out without a database.
    struct StubInspector {
        failing: HashSet<String>,
        slow: HashSet<String>,
    }

    impl StubInspector {
        fn new() -> Self {
            Self {
                failing: HashSet::new(),
                slow: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl SchemaInspector for StubInspector {
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }

        async fn list_schemas(&self) -> Result<Vec<String>> {
            Ok(vec!["public".to_string()])
        }

        async fn inspect_schema(&self, schema: &str) -> Result<SchemaCatalog> {
            if self.failing.contains(schema) {
                return Err(SchemaNestError::insufficient_privileges(format!(
                    "USAGE on schema {}",
                    schema
                )));
            }
            if self.slow.contains(schema) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let mut catalog = SchemaCatalog::new(schema);
            if schema == "public" {
                catalog.insert(Table::new(TableId::new(schema, "users")));
            }
            Ok(catalog)
        }

        fn database_type(&self) -> DatabaseType {
            DatabaseType::PostgreSQL
        }

        fn connection_config(&self) -> ConnectionConfig {
            ConnectionConfig::default().with_query_timeout(Duration::from_secs(1))
        }
    }

    #[tokio::test]
    async fn test_inspect_catalog_keeps_empty_schemas() {
        let inspector = StubInspector::new();
        let catalog = inspect_catalog(
            &inspector,
            &["public".to_string(), "missing".to_string()],
            2,
        )
        .await
        .unwrap();

        assert_eq!(catalog.table_count(), 1);
        assert!(catalog.schemas["missing"].is_empty());
    }

    #[tokio::test]
    async fn test_inspect_catalog_failure_names_schema() {
        let mut inspector = StubInspector::new();
        inspector.failing.insert("billing".to_string());

        let result = inspect_catalog(
            &inspector,
            &["public".to_string(), "billing".to_string()],
            4,
        )
        .await;

        match result {
            Err(SchemaNestError::MetadataAccess { schema, .. }) => assert_eq!(schema, "billing"),
            other => panic!("expected MetadataAccess, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspect_catalog_timeout_is_metadata_access() {
        let mut inspector = StubInspector::new();
        inspector.slow.insert("archive".to_string());

        let result = inspect_catalog(&inspector, &["archive".to_string()], 1).await;

        assert!(matches!(
            result,
            Err(SchemaNestError::MetadataAccess { ref schema, .. }) if schema == "archive"
        ));
    }
}

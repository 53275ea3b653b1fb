//! PostgreSQL inspector.
//!
//! # Module Structure
//! - `connection`: URL parsing, validation, pool creation
//! - `catalog`: schema-wide catalog queries mapped into [`SchemaCatalog`]
//!
//! Every pooled connection runs with `statement_timeout` and
//! `default_transaction_read_only = on`.

mod catalog;
mod connection;

use async_trait::async_trait;
use sqlx::PgPool;

use super::SchemaInspector;
use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::SchemaNestError;
use crate::models::{DatabaseType, SchemaCatalog};

/// PostgreSQL schema inspector backed by a lazily connected pool.
pub struct PostgresInspector {
    pub(crate) pool: PgPool,
    pub(crate) config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresInspector")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl SchemaInspector for PostgresInspector {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(SchemaNestError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(SchemaNestError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        // Columns and constraints come from these two views
        let visible: bool = sqlx::query_scalar(
            "SELECT has_table_privilege('information_schema.columns', 'SELECT') \
             AND has_table_privilege('pg_catalog.pg_constraint', 'SELECT')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            SchemaNestError::insufficient_privileges(format!("Cannot check catalog access: {}", e))
        })?;

        if !visible {
            return Err(SchemaNestError::insufficient_privileges(
                "SELECT on information_schema.columns and pg_catalog.pg_constraint",
            ));
        }

        tracing::info!("PostgreSQL connection test passed for {}", self.config);
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        catalog::list_schemas(&self.pool).await
    }

    async fn inspect_schema(&self, schema: &str) -> Result<SchemaCatalog> {
        catalog::inspect_schema(&self.pool, schema).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}

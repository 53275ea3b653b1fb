//! SQLite inspector.
//!
//! Each attached database (`main`, `temp`, and anything added with
//! `ATTACH DATABASE`) is a schema. Foreign keys in SQLite never cross
//! databases, so every constraint targets its own schema.
//!
//! # Module Structure
//! - `connection`: connection string handling and pool creation
//! - `catalog`: `sqlite_master` and table-valued pragma queries

mod catalog;
mod connection;

pub use connection::{parse_sqlite_connection_config, validate_sqlite_connection_string};

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::SchemaInspector;
use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::SchemaNestError;
use crate::models::{DatabaseType, SchemaCatalog};

/// SQLite schema inspector.
pub struct SqliteInspector {
    pub(crate) pool: SqlitePool,
    pub(crate) config: ConnectionConfig,
}

impl std::fmt::Debug for SqliteInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteInspector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SchemaInspector for SqliteInspector {
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

        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                SchemaNestError::insufficient_privileges(format!(
                    "Cannot access sqlite_master: {}",
                    e
                ))
            })?;

        tracing::info!("SQLite connection test passed for {}", self.config);
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        catalog::list_schemas(&self.pool).await
    }

    async fn inspect_schema(&self, schema: &str) -> Result<SchemaCatalog> {
        catalog::inspect_schema(&self.pool, schema).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}

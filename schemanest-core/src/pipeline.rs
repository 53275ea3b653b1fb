//! Inspect, map, build: the full run from a connection to a document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::Result;
use crate::config::BuildConfig;
use crate::document::{DocumentBuilder, TableNode};
use crate::error::SchemaNestError;
use crate::inspector::{SchemaInspector, inspect_catalog};
use crate::models::Catalog;
use crate::relationships::{RelationshipGraph, RelationshipWarning};

/// Nested documents for every selected schema.
///
/// Serializes as `schema name -> table name -> node`. The warnings collected
/// while mapping relationships travel alongside but are not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DatabaseDocument {
    schemas: BTreeMap<String, BTreeMap<String, TableNode>>,
    #[serde(skip)]
    warnings: Vec<RelationshipWarning>,
}

impl DatabaseDocument {
    /// Maps and builds from an already inspected catalog.
    pub fn from_catalog(catalog: Catalog, max_depth: u32) -> Self {
        let graph = RelationshipGraph::build(catalog);
        let schemas = DocumentBuilder::new(&graph, max_depth).build_all();

        Self {
            schemas,
            warnings: graph.warnings().to_vec(),
        }
    }

    /// Documents keyed by schema, then table.
    pub fn schemas(&self) -> &BTreeMap<String, BTreeMap<String, TableNode>> {
        &self.schemas
    }

    /// Looks up one table's document.
    pub fn table(&self, schema: &str, table: &str) -> Option<&TableNode> {
        self.schemas.get(schema)?.get(table)
    }

    /// Relationship warnings in enumeration order.
    pub fn warnings(&self) -> &[RelationshipWarning] {
        &self.warnings
    }

    /// Number of root documents.
    pub fn table_count(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Renders the document as JSON, indented by two spaces when `pretty`.
    ///
    /// # Errors
    /// Returns a serialization error; not expected for well-formed documents
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };

        rendered.map_err(|source| SchemaNestError::Serialization {
            context: "Failed to render database document".to_string(),
            source,
        })
    }
}

/// Runs the whole pipeline against a live inspector.
///
/// # Errors
/// - [`SchemaNestError::Configuration`] if `config` is invalid
/// - [`SchemaNestError::MetadataAccess`] if any schema cannot be read
pub async fn build_database_document(
    inspector: &dyn SchemaInspector,
    config: &BuildConfig,
) -> Result<DatabaseDocument> {
    config.validate()?;

    let schemas = config.selected_schemas();
    let catalog = inspect_catalog(inspector, &schemas, config.max_concurrent_schemas).await?;

    let document = DatabaseDocument::from_catalog(catalog, config.max_depth);

    tracing::info!(
        "Built documents for {} table(s) at depth {} ({} warning(s))",
        document.table_count(),
        config.max_depth,
        document.warnings().len()
    );

    Ok(document)
}

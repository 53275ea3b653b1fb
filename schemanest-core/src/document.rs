//! Nested document builder.
//!
//! Walks the [`RelationshipGraph`] from a root table and embeds every related
//! table as a sub-document, so foreign keys read as containment.
//!
//! Two bounds keep the walk finite:
//!
//! - **Depth.** The root gets `max_depth`; each level down gets one less. A
//!   node reached with nothing left carries its columns and a
//!   `depth_truncated` marker, but no relationship maps.
//! - **Cycles.** Each node knows the tables strictly above it (its
//!   [`TraversalPath`]). An edge leading back to one of those tables becomes a
//!   `cycle` marker instead of a sub-document. The check is path-scoped: the
//!   same table reached through two unrelated branches is expanded in both.
//!
//! Output maps are `BTreeMap`s, so rendering the same graph twice is
//! byte-identical.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, SchemaNestError};
use crate::models::{Table, TableId};
use crate::relationships::RelationshipGraph;

/// `_table_info` block of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Schema of the table
    pub schema: String,
    /// Table name
    pub table: String,
    /// Primary key columns in key order
    pub primary_keys: Vec<String>,
}

/// Column details as rendered in a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDocument {
    /// Declared type
    pub data_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Whether the column is part of the primary key
    pub is_primary_key: bool,
    /// Length bound of text types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Default expression
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Reserved `_marker` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Target is already on the path above
    Cycle,
    /// Target is not in the catalog
    UnresolvedReference,
    /// Depth budget exhausted
    DepthTruncated,
}

/// Placeholder emitted instead of a sub-document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// What stopped the expansion
    #[serde(rename = "_marker")]
    pub kind: MarkerKind,
    /// `schema.table` of the table that was not expanded
    #[serde(rename = "_reference")]
    pub reference: String,
    /// Referencing column, on unresolved markers only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key_column: Option<String>,
}

impl Marker {
    /// Marker for an edge back onto the path.
    pub fn cycle(target: &TableId) -> Self {
        Self {
            kind: MarkerKind::Cycle,
            reference: target.to_string(),
            foreign_key_column: None,
        }
    }

    /// Marker for an edge to a table outside the catalog.
    pub fn unresolved(target: &TableId, foreign_key_column: &str) -> Self {
        Self {
            kind: MarkerKind::UnresolvedReference,
            reference: target.to_string(),
            foreign_key_column: Some(foreign_key_column.to_string()),
        }
    }
}

/// A related table: either expanded or replaced by a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeDocument {
    /// Expanded sub-document
    Table(Box<TableNode>),
    /// Placeholder
    Marker(Marker),
}

impl NodeDocument {
    /// The expanded node, if this is not a marker.
    pub fn as_table(&self) -> Option<&TableNode> {
        match self {
            NodeDocument::Table(node) => Some(node),
            NodeDocument::Marker(_) => None,
        }
    }

    /// The marker, if this was not expanded.
    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            NodeDocument::Table(_) => None,
            NodeDocument::Marker(marker) => Some(marker),
        }
    }
}

/// Entry under `references`: a table this node points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    /// Referencing column on this node
    pub foreign_key: String,
    /// Referenced column on the target
    pub references_column: String,
    /// The target table
    pub referenced_table: NodeDocument,
}

/// Entry under `referenced_by`: a table pointing at this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencedByEntry {
    /// Referencing column on the child
    pub foreign_key_column: String,
    /// Referenced column on this node
    pub references_this_column: String,
    /// Always true; a parent row may have many children
    pub is_array: bool,
    /// The referencing table
    pub items: NodeDocument,
}

/// One table rendered with its relationships.
///
/// `references` and `referenced_by` are `None` only on depth-truncated nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableNode {
    /// Identity and primary key
    #[serde(rename = "_table_info")]
    pub table_info: TableInfo,
    /// Columns keyed by name
    pub columns: BTreeMap<String, ColumnDocument>,
    /// Tables this node references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<BTreeMap<String, ReferenceEntry>>,
    /// Tables referencing this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_by: Option<BTreeMap<String, ReferencedByEntry>>,
    /// Set to `depth_truncated` when the depth budget ran out here
    #[serde(rename = "_marker", skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerKind>,
}

impl TableNode {
    fn columns_only(table: &Table) -> Self {
        let columns = table
            .columns
            .iter()
            .map(|column| {
                (
                    column.name.clone(),
                    ColumnDocument {
                        data_type: column.data_type.clone(),
                        nullable: column.is_nullable,
                        is_primary_key: column.is_primary_key,
                        max_length: column.max_length,
                        default_value: column.default_value.clone(),
                    },
                )
            })
            .collect();

        Self {
            table_info: TableInfo {
                schema: table.id.schema.clone(),
                table: table.id.name.clone(),
                primary_keys: table.primary_keys.clone(),
            },
            columns,
            references: None,
            referenced_by: None,
            marker: None,
        }
    }

    /// True when this node was cut off by the depth limit.
    pub fn is_depth_truncated(&self) -> bool {
        self.marker == Some(MarkerKind::DepthTruncated)
    }
}

/// Tables strictly above the node being built.
///
/// A linked list of stack frames: extending the path borrows the parent
/// instead of copying it, and the extension disappears when the recursive
/// call returns. A table never appears twice in one path.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalPath<'a> {
    frame: Option<&'a Frame<'a>>,
}

#[derive(Debug)]
struct Frame<'a> {
    table: &'a TableId,
    parent: TraversalPath<'a>,
}

impl<'a> TraversalPath<'a> {
    /// The empty path of a root node.
    pub fn root() -> Self {
        Self { frame: None }
    }

    /// True when `table` is above the node.
    pub fn contains(&self, table: &TableId) -> bool {
        self.iter().any(|t| t == table)
    }

    /// Number of tables on the path.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True for a root node's path.
    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// Innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &'a TableId> {
        std::iter::successors(self.frame, |frame| frame.parent.frame).map(|frame| frame.table)
    }

    /// Runs `f` with `table` appended to this path.
    ///
    /// If `table` is already on the path, `f` receives the path unchanged.
    pub fn with_ancestor<R>(self, table: &'a TableId, f: impl FnOnce(TraversalPath<'_>) -> R) -> R {
        if self.contains(table) {
            return f(self);
        }
        let frame = Frame {
            table,
            parent: self,
        };
        f(TraversalPath {
            frame: Some(&frame),
        })
    }
}

/// Entry key for a related table.
///
/// `<table>_via_<column>`, prefixed with the related table's schema when it
/// differs from the schema of the node being built.
pub fn entry_key(current: &TableId, related: &TableId, column: &str) -> String {
    if related.schema == current.schema {
        format!("{}_via_{}", related.name, column)
    } else {
        format!("{}.{}_via_{}", related.schema, related.name, column)
    }
}

/// Inserts under `key`, suffixing `#2`, `#3`, ... if the key is taken.
///
/// Only happens when one column carries several constraints to the same
/// table; every edge still gets its own entry.
fn insert_unique<V>(map: &mut BTreeMap<String, V>, key: String, value: V) {
    if !map.contains_key(&key) {
        map.insert(key, value);
        return;
    }
    let mut ordinal: usize = 2;
    loop {
        let candidate = format!("{}#{}", key, ordinal);
        if !map.contains_key(&candidate) {
            map.insert(candidate, value);
            return;
        }
        ordinal = ordinal.saturating_add(1);
    }
}

/// Builds nested documents from a relationship graph.
///
/// # Example
/// ```rust
/// use schemanest_core::document::DocumentBuilder;
/// use schemanest_core::models::{Catalog, Column, SchemaCatalog, Table, TableId};
/// use schemanest_core::relationships::RelationshipGraph;
///
/// let mut schema = SchemaCatalog::new("public");
/// schema.insert(
///     Table::new(TableId::new("public", "users"))
///         .with_column(Column::new("id", "integer", 1).primary_key()),
/// );
/// let mut catalog = Catalog::new();
/// catalog.insert_schema(schema);
///
/// let graph = RelationshipGraph::build(catalog);
/// let builder = DocumentBuilder::new(&graph, 3);
/// let node = builder.build_table(&TableId::new("public", "users")).unwrap();
///
/// assert!(node.references.unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentBuilder<'g> {
    graph: &'g RelationshipGraph,
    max_depth: u32,
}

impl<'g> DocumentBuilder<'g> {
    /// Creates a builder expanding up to `max_depth` levels.
    pub fn new(graph: &'g RelationshipGraph, max_depth: u32) -> Self {
        Self { graph, max_depth }
    }

    /// Builds the document rooted at `root`.
    ///
    /// # Errors
    /// [`SchemaNestError::TableNotFound`] if `root` is not in the graph.
    pub fn build_table(&self, root: &TableId) -> Result<TableNode> {
        let table = self
            .graph
            .table(root)
            .ok_or_else(|| SchemaNestError::table_not_found(root))?;
        Ok(self.expand(table, self.max_depth, TraversalPath::root()))
    }

    /// Builds every table of `schema`, keyed by table name.
    ///
    /// A schema that is not in the graph yields an empty map.
    pub fn build_schema(&self, schema: &str) -> BTreeMap<String, TableNode> {
        let Some(schema_catalog) = self.graph.catalog().schemas.get(schema) else {
            return BTreeMap::new();
        };

        schema_catalog
            .tables
            .iter()
            .map(|(name, table)| {
                tracing::trace!("Building document for {}", table.id);
                (
                    name.clone(),
                    self.expand(table, self.max_depth, TraversalPath::root()),
                )
            })
            .collect()
    }

    /// Builds every schema in the graph, empty ones included.
    pub fn build_all(&self) -> BTreeMap<String, BTreeMap<String, TableNode>> {
        self.graph
            .catalog()
            .schemas
            .keys()
            .map(|schema| (schema.clone(), self.build_schema(schema)))
            .collect()
    }

    fn expand(&self, table: &Table, remaining: u32, ancestors: TraversalPath<'_>) -> TableNode {
        let mut node = TableNode::columns_only(table);

        let Some(next) = remaining.checked_sub(1) else {
            node.marker = Some(MarkerKind::DepthTruncated);
            return node;
        };

        let (references, referenced_by) = ancestors.with_ancestor(&table.id, |path| {
            (
                self.references(table, next, ancestors, path),
                self.referenced_by(table, next, ancestors, path),
            )
        });

        node.references = Some(references);
        node.referenced_by = Some(referenced_by);
        node
    }

    fn references(
        &self,
        table: &Table,
        next: u32,
        ancestors: TraversalPath<'_>,
        path: TraversalPath<'_>,
    ) -> BTreeMap<String, ReferenceEntry> {
        let mut entries = BTreeMap::new();

        for edge in self.graph.references(&table.id) {
            let entry = ReferenceEntry {
                foreign_key: edge.source_column.clone(),
                references_column: edge.target_column.clone(),
                referenced_table: self.related(&edge.target, &edge.source_column, next, ancestors, path),
            };
            insert_unique(
                &mut entries,
                entry_key(&table.id, &edge.target, &edge.source_column),
                entry,
            );
        }

        for edge in self.graph.unresolved(&table.id) {
            let entry = ReferenceEntry {
                foreign_key: edge.source_column.clone(),
                references_column: edge.target_column.clone(),
                referenced_table: NodeDocument::Marker(Marker::unresolved(
                    &edge.target,
                    &edge.source_column,
                )),
            };
            insert_unique(
                &mut entries,
                entry_key(&table.id, &edge.target, &edge.source_column),
                entry,
            );
        }

        entries
    }

    fn referenced_by(
        &self,
        table: &Table,
        next: u32,
        ancestors: TraversalPath<'_>,
        path: TraversalPath<'_>,
    ) -> BTreeMap<String, ReferencedByEntry> {
        let mut entries = BTreeMap::new();

        for edge in self.graph.referenced_by(&table.id) {
            let entry = ReferencedByEntry {
                foreign_key_column: edge.source_column.clone(),
                references_this_column: edge.target_column.clone(),
                is_array: true,
                items: self.related(&edge.source, &edge.source_column, next, ancestors, path),
            };
            insert_unique(
                &mut entries,
                entry_key(&table.id, &edge.source, &edge.source_column),
                entry,
            );
        }

        entries
    }

    /// Expands a neighbour, or marks it when it is already above us.
    fn related(
        &self,
        related: &TableId,
        foreign_key_column: &str,
        next: u32,
        ancestors: TraversalPath<'_>,
        path: TraversalPath<'_>,
    ) -> NodeDocument {
        if ancestors.contains(related) {
            return NodeDocument::Marker(Marker::cycle(related));
        }

        match self.graph.table(related) {
            Some(table) => NodeDocument::Table(Box::new(self.expand(table, next, path))),
            None => NodeDocument::Marker(Marker::unresolved(related, foreign_key_column)),
        }
    }
}

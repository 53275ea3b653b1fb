//! Foreign-key relationship graph.
//!
//! Turns the flat [`Catalog`] into a bidirectional graph of single-column
//! foreign keys. Forward edges answer "what does this table reference",
//! reverse edges answer "who references this table". Both indexes are
//! `HashMap`s keyed by [`TableId`] with edges kept in a fixed order:
//! source table, then constraint name, then column.
//!
//! Constraints that cannot become an edge are reported as
//! [`RelationshipWarning`]s instead of failing the build. A single-column
//! constraint whose target is missing from the catalog is still retained as
//! an [`UnresolvedEdge`] so the document can show where it pointed.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::models::{Catalog, ForeignKeyConstraint, Table, TableId};

/// A resolved single-column foreign key. Both endpoints exist in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyEdge {
    /// Name of the constraint the edge came from
    pub constraint_name: Option<String>,
    /// Referencing table
    pub source: TableId,
    /// Referencing column
    pub source_column: String,
    /// Referenced table
    pub target: TableId,
    /// Referenced column
    pub target_column: String,
}

/// A single-column foreign key whose target table is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedEdge {
    /// Name of the constraint the edge came from
    pub constraint_name: Option<String>,
    /// Referencing table
    pub source: TableId,
    /// Referencing column
    pub source_column: String,
    /// Declared target, absent from the catalog
    pub target: TableId,
    /// Declared target column
    pub target_column: String,
}

/// Non-fatal findings while mapping foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipWarning {
    /// Multi-column constraint; not mapped to any edge
    CompositeForeignKey {
        /// Table declaring the constraint
        table: TableId,
        /// Constraint name, if known
        constraint_name: Option<String>,
        /// Referencing columns
        columns: Vec<String>,
    },
    /// Target schema was not selected for inspection
    ExcludedTarget {
        /// Table declaring the constraint
        table: TableId,
        /// Referencing column
        column: String,
        /// Referenced table
        target: TableId,
    },
    /// Target schema was inspected but the table does not exist in it
    DanglingTarget {
        /// Table declaring the constraint
        table: TableId,
        /// Referencing column
        column: String,
        /// Referenced table
        target: TableId,
    },
}

impl fmt::Display for RelationshipWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipWarning::CompositeForeignKey {
                table,
                constraint_name,
                columns,
            } => write!(
                f,
                "{}: composite foreign key {} ({}) is not supported and was skipped",
                table,
                constraint_name.as_deref().unwrap_or("<unnamed>"),
                columns.join(", ")
            ),
            RelationshipWarning::ExcludedTarget {
                table,
                column,
                target,
            } => write!(
                f,
                "{}.{} references {} whose schema is not selected",
                table, column, target
            ),
            RelationshipWarning::DanglingTarget {
                table,
                column,
                target,
            } => write!(
                f,
                "{}.{} references {} which does not exist",
                table, column, target
            ),
        }
    }
}

/// Bidirectional foreign-key graph over an inspected catalog.
///
/// Owns its catalog so document building needs nothing but the graph.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    catalog: Catalog,
    forward: HashMap<TableId, Vec<ForeignKeyEdge>>,
    reverse: HashMap<TableId, Vec<ForeignKeyEdge>>,
    unresolved: HashMap<TableId, Vec<UnresolvedEdge>>,
    warnings: Vec<RelationshipWarning>,
}

impl RelationshipGraph {
    /// Builds the graph from a catalog.
    pub fn build(catalog: Catalog) -> Self {
        let mut forward: HashMap<TableId, Vec<ForeignKeyEdge>> = HashMap::new();
        let mut reverse: HashMap<TableId, Vec<ForeignKeyEdge>> = HashMap::new();
        let mut unresolved: HashMap<TableId, Vec<UnresolvedEdge>> = HashMap::new();
        let mut warnings = Vec::new();

        // Catalog iteration is already (schema, table) ordered, so pushing
        // in enumeration order keeps the reverse index sorted by source too.
        for table in catalog.tables() {
            for constraint in sorted_constraints(table) {
                if constraint.is_composite() {
                    tracing::warn!(
                        "Skipping composite foreign key {} on {} ({})",
                        constraint.name.as_deref().unwrap_or("<unnamed>"),
                        table.id,
                        constraint.columns.join(", ")
                    );
                    warnings.push(RelationshipWarning::CompositeForeignKey {
                        table: table.id.clone(),
                        constraint_name: constraint.name.clone(),
                        columns: constraint.columns.clone(),
                    });
                    continue;
                }

                let (Some(source_column), Some(target_column)) = (
                    constraint.columns.first(),
                    constraint.referenced_columns.first(),
                ) else {
                    tracing::debug!(
                        "Ignoring foreign key {} on {} with no column mapping",
                        constraint.name.as_deref().unwrap_or("<unnamed>"),
                        table.id
                    );
                    continue;
                };

                let target = constraint.referenced_id();

                if catalog.table(&target).is_some() {
                    let edge = ForeignKeyEdge {
                        constraint_name: constraint.name.clone(),
                        source: table.id.clone(),
                        source_column: source_column.clone(),
                        target: target.clone(),
                        target_column: target_column.clone(),
                    };
                    forward
                        .entry(table.id.clone())
                        .or_default()
                        .push(edge.clone());
                    reverse.entry(target).or_default().push(edge);
                    continue;
                }

                let warning = if catalog.contains_schema(&target.schema) {
                    RelationshipWarning::DanglingTarget {
                        table: table.id.clone(),
                        column: source_column.clone(),
                        target: target.clone(),
                    }
                } else {
                    RelationshipWarning::ExcludedTarget {
                        table: table.id.clone(),
                        column: source_column.clone(),
                        target: target.clone(),
                    }
                };
                tracing::warn!("{}", warning);
                warnings.push(warning);

                unresolved
                    .entry(table.id.clone())
                    .or_default()
                    .push(UnresolvedEdge {
                        constraint_name: constraint.name.clone(),
                        source: table.id.clone(),
                        source_column: source_column.clone(),
                        target,
                        target_column: target_column.clone(),
                    });
            }
        }

        let graph = Self {
            catalog,
            forward,
            reverse,
            unresolved,
            warnings,
        };

        tracing::debug!(
            "Mapped {} foreign key edges across {} tables ({} warnings)",
            graph.edge_count(),
            graph.catalog.table_count(),
            graph.warnings.len()
        );

        graph
    }

    /// The inspected catalog the graph was built from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Looks up a table by qualified identity.
    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.catalog.table(id)
    }

    /// Edges where `id` is the source.
    pub fn references(&self, id: &TableId) -> &[ForeignKeyEdge] {
        self.forward.get(id).map_or(&[], Vec::as_slice)
    }

    /// Edges where `id` is the target.
    pub fn referenced_by(&self, id: &TableId) -> &[ForeignKeyEdge] {
        self.reverse.get(id).map_or(&[], Vec::as_slice)
    }

    /// Single-column foreign keys of `id` whose target is not in the catalog.
    pub fn unresolved(&self, id: &TableId) -> &[UnresolvedEdge] {
        self.unresolved.get(id).map_or(&[], Vec::as_slice)
    }

    /// Warnings in enumeration order.
    pub fn warnings(&self) -> &[RelationshipWarning] {
        &self.warnings
    }

    /// Number of resolved edges.
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }
}

/// A table's constraints ordered by constraint name, then source columns.
fn sorted_constraints(table: &Table) -> Vec<&ForeignKeyConstraint> {
    let mut constraints: Vec<&ForeignKeyConstraint> = table.foreign_keys.iter().collect();
    constraints.sort_by(|a, b| {
        a.name
            .as_deref()
            .unwrap_or_default()
            .cmp(b.name.as_deref().unwrap_or_default())
            .then_with(|| a.columns.cmp(&b.columns))
    });
    constraints
}

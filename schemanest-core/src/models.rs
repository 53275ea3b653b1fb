//! Catalog models produced by schema inspection.
//!
//! These are the typed rows every inspector engine maps its catalog queries
//! into. They describe structure only; no model ever holds row data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    /// PostgreSQL, one schema per namespace
    PostgreSQL,
    /// SQLite, one schema per attached database
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// Fully-qualified table identity.
///
/// Ordered by schema, then name, so every map keyed by `TableId` iterates
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    /// Schema (or attached database) name
    pub schema: String,
    /// Table name within the schema
    pub name: String,
}

impl TableId {
    /// Creates a table identity.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Database column information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type as reported by the catalog (`integer`, `varchar`, ...)
    pub data_type: String,
    /// Whether the column accepts NULL
    pub is_nullable: bool,
    /// Whether the column is part of the primary key
    pub is_primary_key: bool,
    /// Maximum character length for bounded text types
    pub max_length: Option<u32>,
    /// Default expression, verbatim from the catalog
    pub default_value: Option<String>,
    /// 1-based position within the table
    pub ordinal_position: u32,
}

impl Column {
    /// Creates a nullable, non-key column with no extra details.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal_position: u32) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
            max_length: None,
            default_value: None,
            ordinal_position,
        }
    }

    /// Builder method to mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Builder method to mark the column as a primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    /// Builder method to set the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Builder method to set the default expression.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Foreign key constraint as declared in the catalog.
///
/// `columns` and `referenced_columns` are positionally paired. Constraints
/// with more than one column are kept here verbatim; the relationship mapper
/// decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Constraint name, if the engine reports one
    pub name: Option<String>,
    /// Referencing columns in key order
    pub columns: Vec<String>,
    /// Schema of the referenced table
    pub referenced_schema: String,
    /// Name of the referenced table
    pub referenced_table: String,
    /// Referenced columns in key order
    pub referenced_columns: Vec<String>,
}

impl ForeignKeyConstraint {
    /// Identity of the referenced table.
    pub fn referenced_id(&self) -> TableId {
        TableId::new(&self.referenced_schema, &self.referenced_table)
    }

    /// True when the constraint spans more than one column.
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1 || self.referenced_columns.len() > 1
    }
}

/// Database table information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Qualified table identity
    pub id: TableId,
    /// Columns in ordinal order; names are unique within a table
    pub columns: Vec<Column>,
    /// Primary key column names in key order
    pub primary_keys: Vec<String>,
    /// Outgoing foreign key constraints
    pub foreign_keys: Vec<ForeignKeyConstraint>,
}

impl Table {
    /// Creates a table with no columns or constraints.
    pub fn new(id: TableId) -> Self {
        Self {
            id,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Builder method to add a column; primary key columns join the key.
    pub fn with_column(mut self, column: Column) -> Self {
        if column.is_primary_key && !self.primary_keys.contains(&column.name) {
            self.primary_keys.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    /// Builder method to add a foreign key constraint.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyConstraint) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// All tables of one schema, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Schema name
    pub name: String,
    /// Tables keyed by name
    pub tables: BTreeMap<String, Table>,
}

impl SchemaCatalog {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Inserts a table, replacing any previous table of the same name.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.id.name.clone(), table);
    }

    /// True when the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Inspection result across all selected schemas.
///
/// A selected schema that does not exist in the database is present with
/// zero tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Inspected schemas keyed by name
    pub schemas: BTreeMap<String, SchemaCatalog>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema, replacing any previous schema of the same name.
    pub fn insert_schema(&mut self, schema: SchemaCatalog) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// True when `schema` was inspected, even if it has no tables.
    pub fn contains_schema(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    /// Looks up a table by qualified identity.
    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.schemas.get(&id.schema)?.tables.get(&id.name)
    }

    /// Iterates every table in `(schema, name)` order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schemas.values().flat_map(|s| s.tables.values())
    }

    /// Number of tables across all schemas.
    pub fn table_count(&self) -> usize {
        self.schemas.values().map(|s| s.tables.len()).sum()
    }
}

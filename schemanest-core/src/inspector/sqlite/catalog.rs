//! SQLite catalog queries.
//!
//! # SQLite System Tables
//! - `pragma_database_list`: attached databases, i.e. schemas
//! - `<schema>.sqlite_master`: table definitions
//! - `pragma_table_info(table, schema)`: columns and primary key positions
//! - `pragma_foreign_key_list(table, schema)`: foreign keys, one row per column

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::Result;
use crate::inspector::helpers::{RowExt, map_query_error, to_u32};
use crate::models::{Column, ForeignKeyConstraint, SchemaCatalog, Table, TableId};

/// Lists attached databases, excluding the connection-private `temp`.
pub(crate) async fn list_schemas(pool: &SqlitePool) -> Result<Vec<String>> {
    let mut schemas = attached_databases(pool).await?;
    schemas.retain(|name| name != "temp");
    schemas.sort();
    Ok(schemas)
}

async fn attached_databases(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM pragma_database_list ORDER BY seq")
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("pragma_database_list", e))?;

    let mut names = Vec::with_capacity(rows.len());
    for row in &rows {
        names.push(row.get_field::<String>("name", None)?);
    }
    Ok(names)
}

/// Reads one attached database into a [`SchemaCatalog`].
pub(crate) async fn inspect_schema(pool: &SqlitePool, schema: &str) -> Result<SchemaCatalog> {
    let mut catalog = SchemaCatalog::new(schema);

    if !attached_databases(pool).await?.iter().any(|name| name == schema) {
        tracing::warn!("Schema '{}' is not attached; it will be empty", schema);
        return Ok(catalog);
    }

    let mut tables = BTreeMap::new();
    for table_name in table_names(pool, schema).await? {
        let table = collect_table(pool, schema, &table_name).await?;
        tables.insert(table_name, table);
    }

    canonicalize_referenced_tables(&mut tables);
    resolve_implicit_references(&mut tables);

    for table in tables.into_values() {
        tracing::trace!(
            "Collected table '{}' with {} columns, {} foreign keys",
            table.id,
            table.columns.len(),
            table.foreign_keys.len()
        );
        catalog.insert(table);
    }

    tracing::info!(
        "Collected {} tables from schema '{}'",
        catalog.tables.len(),
        schema
    );
    Ok(catalog)
}

async fn table_names(pool: &SqlitePool, schema: &str) -> Result<Vec<String>> {
    let query = format!(
        "SELECT name FROM {}.sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
        quote_identifier(schema)
    );

    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("sqlite_master", e))?;

    let mut names = Vec::with_capacity(rows.len());
    for row in &rows {
        names.push(row.get_field::<String>("name", None)?);
    }
    Ok(names)
}

async fn collect_table(pool: &SqlitePool, schema: &str, table_name: &str) -> Result<Table> {
    let context = Some(table_name);

    let column_rows = sqlx::query("SELECT * FROM pragma_table_info(?1, ?2) ORDER BY cid")
        .bind(table_name)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("pragma_table_info", e))?;

    let mut table = Table::new(TableId::new(schema, table_name));
    let mut key_positions: Vec<(i64, String)> = Vec::new();

    for row in &column_rows {
        let cid: i64 = row.get_field("cid", context)?;
        let name: String = row.get_field("name", context)?;
        let declared_type: String = row.get_field("type", context)?;
        let not_null: i64 = row.get_field("notnull", context)?;
        let default_value: Option<String> = row.get_field("dflt_value", context)?;
        let pk: i64 = row.get_field("pk", context)?;

        if pk > 0 {
            key_positions.push((pk, name.clone()));
        }

        table.columns.push(Column {
            max_length: declared_max_length(&declared_type),
            name,
            data_type: declared_type,
            // Primary key columns are NOT NULL even when not declared so
            is_nullable: not_null == 0 && pk == 0,
            is_primary_key: pk > 0,
            default_value,
            ordinal_position: to_u32(cid.saturating_add(1)).unwrap_or_default(),
        });
    }

    key_positions.sort();
    table.primary_keys = key_positions.into_iter().map(|(_, name)| name).collect();

    let fk_rows = sqlx::query("SELECT * FROM pragma_foreign_key_list(?1, ?2) ORDER BY id, seq")
        .bind(table_name)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("pragma_foreign_key_list", e))?;

    // Composite keys share an id; rows are ordered by seq within it
    let mut constraints: BTreeMap<i64, ForeignKeyConstraint> = BTreeMap::new();
    for row in &fk_rows {
        let id: i64 = row.get_field("id", context)?;
        let referenced_table: String = row.get_field("table", context)?;
        let from: String = row.get_field("from", context)?;
        let to: Option<String> = row.get_field("to", context)?;

        let constraint = constraints.entry(id).or_insert_with(|| ForeignKeyConstraint {
            name: Some(format!("fk_{}_{}", table_name, id)),
            columns: Vec::new(),
            referenced_schema: schema.to_string(),
            referenced_table,
            referenced_columns: Vec::new(),
        });
        constraint.columns.push(from);
        // Empty until resolved against the parent's primary key
        constraint.referenced_columns.push(to.unwrap_or_default());
    }

    table.foreign_keys = constraints.into_values().collect();
    Ok(table)
}

/// Rewrites referenced table names to their `sqlite_master` spelling.
///
/// SQLite matches table names case-insensitively, so `REFERENCES Authors`
/// names the table `authors`. Names with no match are left as declared.
fn canonicalize_referenced_tables(tables: &mut BTreeMap<String, Table>) {
    let canonical: BTreeMap<String, String> = tables
        .keys()
        .map(|name| (name.to_ascii_lowercase(), name.clone()))
        .collect();

    for table in tables.values_mut() {
        for constraint in &mut table.foreign_keys {
            if let Some(name) = canonical.get(&constraint.referenced_table.to_ascii_lowercase()) {
                constraint.referenced_table.clone_from(name);
            }
        }
    }
}

/// Fills referenced columns omitted in `REFERENCES parent` clauses.
///
/// SQLite reports them as NULL; they mean the parent's primary key, or
/// `rowid` when the parent has none or is not in this schema.
fn resolve_implicit_references(tables: &mut BTreeMap<String, Table>) {
    let primary_keys: BTreeMap<String, Vec<String>> = tables
        .iter()
        .map(|(name, table)| (name.clone(), table.primary_keys.clone()))
        .collect();

    for table in tables.values_mut() {
        for constraint in &mut table.foreign_keys {
            let parent_keys = primary_keys.get(&constraint.referenced_table);
            for (position, column) in constraint.referenced_columns.iter_mut().enumerate() {
                if column.is_empty() {
                    *column = parent_keys
                        .and_then(|keys| keys.get(position))
                        .cloned()
                        .unwrap_or_else(|| "rowid".to_string());
                }
            }
        }
    }
}

/// Length bound of a declared text type, e.g. `VARCHAR(255)`.
fn declared_max_length(declared_type: &str) -> Option<u32> {
    let upper = declared_type.to_ascii_uppercase();
    if !(upper.contains("CHAR") || upper.contains("TEXT") || upper.contains("CLOB")) {
        return None;
    }

    let (_, rest) = upper.split_once('(')?;
    let (inner, _) = rest.split_once(')')?;
    let first = inner.split(',').next()?;
    first.trim().parse().ok()
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_max_length() {
        assert_eq!(declared_max_length("VARCHAR(255)"), Some(255));
        assert_eq!(declared_max_length("nvarchar( 32 )"), Some(32));
        assert_eq!(declared_max_length("CHARACTER(20)"), Some(20));
        assert_eq!(declared_max_length("TEXT"), None);
        assert_eq!(declared_max_length("DECIMAL(10,2)"), None);
        assert_eq!(declared_max_length("INTEGER"), None);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("main"), "\"main\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_resolve_implicit_references() {
        let parent = Table::new(TableId::new("main", "parent"))
            .with_column(Column::new("code", "TEXT", 1).primary_key());
        let child = Table::new(TableId::new("main", "child")).with_foreign_key(ForeignKeyConstraint {
            name: Some("fk_child_0".to_string()),
            columns: vec!["parent_code".to_string()],
            referenced_schema: "main".to_string(),
            referenced_table: "parent".to_string(),
            referenced_columns: vec![String::new()],
        });
        let orphan = Table::new(TableId::new("main", "orphan")).with_foreign_key(ForeignKeyConstraint {
            name: Some("fk_orphan_0".to_string()),
            columns: vec!["ghost_id".to_string()],
            referenced_schema: "main".to_string(),
            referenced_table: "ghost".to_string(),
            referenced_columns: vec![String::new()],
        });

        let mut tables = BTreeMap::new();
        tables.insert("parent".to_string(), parent);
        tables.insert("child".to_string(), child);
        tables.insert("orphan".to_string(), orphan);

        resolve_implicit_references(&mut tables);

        assert_eq!(tables["child"].foreign_keys[0].referenced_columns, vec!["code"]);
        assert_eq!(tables["orphan"].foreign_keys[0].referenced_columns, vec!["rowid"]);
    }

    #[test]
    fn test_canonicalize_referenced_tables() {
        let authors = Table::new(TableId::new("main", "authors"))
            .with_column(Column::new("id", "INTEGER", 1).primary_key());
        let books = Table::new(TableId::new("main", "books")).with_foreign_key(ForeignKeyConstraint {
            name: Some("fk_books_0".to_string()),
            columns: vec!["author_id".to_string()],
            referenced_schema: "main".to_string(),
            referenced_table: "AUTHORS".to_string(),
            referenced_columns: vec![String::new()],
        });

        let mut tables = BTreeMap::new();
        tables.insert("authors".to_string(), authors);
        tables.insert("books".to_string(), books);

        canonicalize_referenced_tables(&mut tables);
        resolve_implicit_references(&mut tables);

        let constraint = &tables["books"].foreign_keys[0];
        assert_eq!(constraint.referenced_table, "authors");
        assert_eq!(constraint.referenced_columns, vec!["id"]);
    }
}

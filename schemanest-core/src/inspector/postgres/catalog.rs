//! PostgreSQL catalog queries.
//!
//! One query per concern per schema (tables, columns, primary keys, foreign
//! keys) rather than one per table. `information_schema` columns are domain
//! types, so every text or number column is cast before decoding.

use std::collections::BTreeMap;

use sqlx::PgPool;

use crate::Result;
use crate::inspector::helpers::{RowExt, map_query_error, to_u32};
use crate::models::{Column, ForeignKeyConstraint, SchemaCatalog, Table, TableId};

const SCHEMA_EXISTS_QUERY: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1
    ) AS present
"#;

const LIST_SCHEMAS_QUERY: &str = r#"
    SELECT nspname::text AS schema_name
    FROM pg_catalog.pg_namespace
    WHERE nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
    AND nspname NOT LIKE 'pg_temp_%'
    AND nspname NOT LIKE 'pg_toast_temp_%'
    AND has_schema_privilege(nspname, 'USAGE')
    ORDER BY nspname
"#;

const TABLES_QUERY: &str = r#"
    SELECT t.table_name::text AS table_name
    FROM information_schema.tables t
    WHERE t.table_schema = $1
    AND t.table_type = 'BASE TABLE'
    ORDER BY t.table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        CASE
            WHEN c.data_type IN ('USER-DEFINED', 'ARRAY') THEN c.udt_name::text
            ELSE c.data_type::text
        END AS data_type,
        c.character_maximum_length::bigint AS character_maximum_length,
        (c.is_nullable = 'YES') AS is_nullable,
        c.column_default::text AS column_default,
        c.ordinal_position::bigint AS ordinal_position
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema
        AND t.table_name = c.table_name
        AND t.table_type = 'BASE TABLE'
    WHERE c.table_schema = $1
    ORDER BY c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_QUERY: &str = r#"
    SELECT
        tc.table_name::text AS table_name,
        kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
        AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    ORDER BY tc.table_name, kcu.ordinal_position
"#;

// conkey/confkey are positionally paired; unnest keeps the pairing and the
// ordinality gives the key order.
const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        cl.relname::text AS table_name,
        con.conname::text AS constraint_name,
        a.attname::text AS column_name,
        fns.nspname::text AS referenced_schema,
        fcl.relname::text AS referenced_table,
        fa.attname::text AS referenced_column
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
    JOIN pg_catalog.pg_namespace ns ON ns.oid = cl.relnamespace
    JOIN pg_catalog.pg_class fcl ON fcl.oid = con.confrelid
    JOIN pg_catalog.pg_namespace fns ON fns.oid = fcl.relnamespace
    CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
        WITH ORDINALITY AS k(attnum, refattnum, position)
    JOIN pg_catalog.pg_attribute a
        ON a.attrelid = con.conrelid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute fa
        ON fa.attrelid = con.confrelid AND fa.attnum = k.refattnum
    WHERE con.contype = 'f'
    AND ns.nspname = $1
    ORDER BY cl.relname, con.conname, k.position
"#;

/// Lists user schemas the connection may use.
pub(crate) async fn list_schemas(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query(LIST_SCHEMAS_QUERY)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("pg_catalog.pg_namespace", e))?;

    let mut schemas = Vec::with_capacity(rows.len());
    for row in &rows {
        schemas.push(row.get_field::<String>("schema_name", None)?);
    }

    tracing::debug!("Found {} accessible schemas", schemas.len());
    Ok(schemas)
}

/// Reads one schema into a [`SchemaCatalog`].
pub(crate) async fn inspect_schema(pool: &PgPool, schema: &str) -> Result<SchemaCatalog> {
    let mut catalog = SchemaCatalog::new(schema);

    let present: bool = sqlx::query_scalar(SCHEMA_EXISTS_QUERY)
        .bind(schema)
        .fetch_one(pool)
        .await
        .map_err(|e| map_query_error("pg_catalog.pg_namespace", e))?;

    if !present {
        tracing::warn!("Schema '{}' does not exist; it will be empty", schema);
        return Ok(catalog);
    }

    let mut tables = collect_tables(pool, schema).await?;
    collect_columns(pool, schema, &mut tables).await?;
    collect_primary_keys(pool, schema, &mut tables).await?;
    collect_foreign_keys(pool, schema, &mut tables).await?;

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

async fn collect_tables(pool: &PgPool, schema: &str) -> Result<BTreeMap<String, Table>> {
    let rows = sqlx::query(TABLES_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("information_schema.tables", e))?;

    let mut tables = BTreeMap::new();
    for row in &rows {
        let name: String = row.get_field("table_name", None)?;
        tables.insert(name.clone(), Table::new(TableId::new(schema, name)));
    }
    Ok(tables)
}

async fn collect_columns(
    pool: &PgPool,
    schema: &str,
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("information_schema.columns", e))?;

    for row in &rows {
        let table_name: String = row.get_field("table_name", None)?;
        let context = Some(table_name.as_str());

        let Some(table) = tables.get_mut(&table_name) else {
            continue;
        };

        let max_length: Option<i64> = row.get_field("character_maximum_length", context)?;
        let ordinal_position: i64 = row.get_field("ordinal_position", context)?;

        table.columns.push(Column {
            name: row.get_field("column_name", context)?,
            data_type: row.get_field("data_type", context)?,
            is_nullable: row.get_field("is_nullable", context)?,
            is_primary_key: false,
            max_length: max_length.and_then(to_u32),
            default_value: row.get_field("column_default", context)?,
            ordinal_position: to_u32(ordinal_position).unwrap_or_default(),
        });
    }
    Ok(())
}

async fn collect_primary_keys(
    pool: &PgPool,
    schema: &str,
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let rows = sqlx::query(PRIMARY_KEYS_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("information_schema.key_column_usage", e))?;

    for row in &rows {
        let table_name: String = row.get_field("table_name", None)?;
        let column_name: String = row.get_field("column_name", Some(table_name.as_str()))?;

        if let Some(table) = tables.get_mut(&table_name) {
            if let Some(column) = table.columns.iter_mut().find(|c| c.name == column_name) {
                column.is_primary_key = true;
            }
            table.primary_keys.push(column_name);
        }
    }
    Ok(())
}

async fn collect_foreign_keys(
    pool: &PgPool,
    schema: &str,
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let rows = sqlx::query(FOREIGN_KEYS_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| map_query_error("pg_catalog.pg_constraint", e))?;

    // Rows arrive ordered by table, constraint, key position
    let mut constraints: BTreeMap<(String, String), ForeignKeyConstraint> = BTreeMap::new();
    for row in &rows {
        let table_name: String = row.get_field("table_name", None)?;
        let context = Some(table_name.as_str());
        let constraint_name: String = row.get_field("constraint_name", context)?;
        let column: String = row.get_field("column_name", context)?;
        let referenced_column: String = row.get_field("referenced_column", context)?;
        let referenced_schema: String = row.get_field("referenced_schema", context)?;
        let referenced_table: String = row.get_field("referenced_table", context)?;

        let constraint = constraints
            .entry((table_name, constraint_name.clone()))
            .or_insert_with(|| ForeignKeyConstraint {
                name: Some(constraint_name),
                columns: Vec::new(),
                referenced_schema,
                referenced_table,
                referenced_columns: Vec::new(),
            });
        constraint.columns.push(column);
        constraint.referenced_columns.push(referenced_column);
    }

    for ((table_name, _), constraint) in constraints {
        if let Some(table) = tables.get_mut(&table_name) {
            table.foreign_keys.push(constraint);
        }
    }
    Ok(())
}

//! Core library for SchemaNest.
//!
//! Converts a relational database's structural metadata into nested JSON
//! documents that mirror foreign keys as containment:
//!
//! 1. [`inspector`] reads tables, columns and foreign keys per schema
//! 2. [`relationships`] maps single-column foreign keys into a graph
//! 3. [`document`] walks the graph into depth-bounded, cycle-safe documents
//!
//! [`pipeline::build_database_document`] runs all three against a live
//! connection.
//!
//! # Security Guarantees
//! - No credentials stored or logged in any data structure
//! - Metadata queries only; row data is never read
//! - Connection strings are redacted in every error and log line

pub mod config;
pub mod document;
pub mod error;
pub mod inspector;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod relationships;

pub use config::{BuildConfig, ConnectionConfig, MAX_SUPPORTED_DEPTH};
pub use document::{DocumentBuilder, MarkerKind, NodeDocument, TableNode, TraversalPath};
pub use error::{Result, SchemaNestError, redact_database_url};
pub use inspector::{SchemaInspector, create_inspector, inspect_catalog};
pub use models::{Catalog, Column, DatabaseType, ForeignKeyConstraint, SchemaCatalog, Table, TableId};
pub use pipeline::{DatabaseDocument, build_database_document};
pub use relationships::{ForeignKeyEdge, RelationshipGraph, RelationshipWarning, UnresolvedEdge};

//! Library side of the `schemanest` command-line tool.
//!
//! The binary in `main.rs` only parses arguments; the steps it runs live
//! here so they can be tested without a terminal.

pub mod config;
pub mod credentials;
pub mod output;

use std::path::PathBuf;

use schemanest_core::{DatabaseDocument, Result, build_database_document, create_inspector};

use crate::config::ProjectConfig;

/// Inspects the database, builds the document and writes it.
///
/// When `project` selects no schemas, every schema the connection can see is
/// exported.
///
/// # Errors
/// Returns connection, metadata, configuration, or I/O errors from the
/// individual steps.
pub async fn export(database_url: &str, project: &ProjectConfig) -> Result<(DatabaseDocument, PathBuf)> {
    let inspector = create_inspector(database_url).await?;

    let mut build_config = project.build_config();
    if build_config.schemas.is_empty() {
        build_config.schemas = inspector.list_schemas().await?;
        tracing::info!(
            "No schemas selected; exporting all {} visible schema(s)",
            build_config.schemas.len()
        );
    }

    let document = build_database_document(inspector.as_ref(), &build_config).await?;

    let output_path = project.output_path();
    output::write_document(&document, &output_path, build_config.pretty).await?;

    Ok((document, output_path))
}

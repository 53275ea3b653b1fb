//! Writes rendered documents to disk.

use std::path::Path;

use schemanest_core::{DatabaseDocument, Result, SchemaNestError};

/// Renders `document` and writes it to `output_path`.
///
/// Missing parent directories are created. Returns the number of bytes
/// written.
///
/// # Errors
/// Returns an I/O error if the directory or file cannot be written.
pub async fn write_document(
    document: &DatabaseDocument,
    output_path: &Path,
    pretty: bool,
) -> Result<usize> {
    let json = document.to_json(pretty)?;

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SchemaNestError::Io {
                context: format!("Failed to create directory {}", parent.display()),
                source,
            })?;
    }

    tokio::fs::write(output_path, &json)
        .await
        .map_err(|source| SchemaNestError::Io {
            context: format!("Failed to write to {}", output_path.display()),
            source,
        })?;

    tracing::debug!("Wrote {} bytes to {}", json.len(), output_path.display());
    Ok(json.len())
}

/// One-paragraph run summary for the terminal.
pub fn summary(document: &DatabaseDocument, output_path: &Path) -> String {
    let mut lines = vec![
        "Database structure exported successfully".to_string(),
        format!("Output: {}", output_path.display()),
        format!("Schemas: {}", document.schemas().len()),
        format!("Tables: {}", document.table_count()),
    ];
    if !document.warnings().is_empty() {
        lines.push(format!("Warnings: {}", document.warnings().len()));
    }
    lines.join("\n")
}

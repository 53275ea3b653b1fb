//! Helper utilities shared by the inspector engines.

use sqlx::{ColumnIndex, Row};

use crate::{Result, error::SchemaNestError};

/// Extension trait for extracting typed values from catalog rows
/// with consistent error handling.
///
/// # Example
/// ```rust,ignore
/// use schemanest_core::inspector::helpers::RowExt;
///
/// let name: String = row.get_field("column_name", Some("my_table"))?;
/// let length: Option<i32> = row.get_field("character_maximum_length", None)?;
/// ```
pub trait RowExt: Row {
    /// Extracts a typed field from the row with proper error context.
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, Self::Database> + sqlx::Type<Self::Database>;
}

impl<R> RowExt for R
where
    R: Row,
    for<'a> &'a str: ColumnIndex<R>,
{
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, Self::Database> + sqlx::Type<Self::Database>,
    {
        self.try_get(field_name)
            .map_err(|e| SchemaNestError::parse_field(field_name, table_context, e))
    }
}

/// Maps a failed catalog query to a typed error.
///
/// SQLSTATE 42501 (`insufficient_privilege`) becomes
/// [`SchemaNestError::InsufficientPrivileges`]; everything else is a
/// catalog query failure naming `resource`.
pub fn map_query_error(resource: &str, error: sqlx::Error) -> SchemaNestError {
    match &error {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("42501") => {
            SchemaNestError::insufficient_privileges(format!(
                "Cannot access {} - insufficient privileges",
                resource
            ))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            SchemaNestError::connection_failed(error)
        }
        _ => SchemaNestError::catalog_query(format!("Failed to query {}", resource), error),
    }
}

/// Converts a catalog integer into a non-negative `u32`, if it fits.
pub fn to_u32(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_query_error_pool_timeout_is_connection() {
        let error = map_query_error("information_schema.columns", sqlx::Error::PoolTimedOut);
        assert!(matches!(error, SchemaNestError::Connection { .. }));
    }

    #[test]
    fn test_map_query_error_other_is_catalog() {
        let error = map_query_error("pg_constraint", sqlx::Error::RowNotFound);
        assert!(matches!(error, SchemaNestError::Catalog { .. }));
        assert!(error.to_string().contains("pg_constraint"));
    }

    #[test]
    fn test_to_u32() {
        assert_eq!(to_u32(255), Some(255));
        assert_eq!(to_u32(-1), None);
        assert_eq!(to_u32(i64::MAX), None);
    }
}

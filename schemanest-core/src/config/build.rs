//! Document build configuration.

use serde::{Deserialize, Serialize};

use crate::error::SchemaNestError;

/// Nesting depth used when none is configured.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Upper bound accepted for `max_depth`.
///
/// Document size grows exponentially with depth on dense graphs; anything
/// past this is treated as a configuration mistake.
pub const MAX_SUPPORTED_DEPTH: u32 = 16;

/// Upper bound for concurrent schema inspections.
pub const MAX_CONCURRENT_SCHEMAS: usize = 16;

/// Resolved configuration handed to the build pipeline.
///
/// # Example
/// ```rust
/// use schemanest_core::config::BuildConfig;
///
/// let config = BuildConfig::new(vec!["public".to_string()])
///     .with_max_depth(2)
///     .with_pretty(false);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Schemas to inspect, in selection order. Duplicates are ignored.
    pub schemas: Vec<String>,
    /// Maximum nesting depth below each root table
    pub max_depth: u32,
    /// Indent the rendered JSON
    pub pretty: bool,
    /// How many schemas are inspected at once
    pub max_concurrent_schemas: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            pretty: true,
            max_concurrent_schemas: 4,
        }
    }
}

impl BuildConfig {
    /// Creates a configuration for `schemas` with default settings.
    pub fn new(schemas: Vec<String>) -> Self {
        Self {
            schemas,
            ..Default::default()
        }
    }

    /// Builder method to set the maximum depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder method to set pretty printing.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Builder method to set schema concurrency.
    pub fn with_max_concurrent_schemas(mut self, max_concurrent_schemas: usize) -> Self {
        self.max_concurrent_schemas = max_concurrent_schemas;
        self
    }

    /// Selected schemas with duplicates removed, first occurrence wins.
    pub fn selected_schemas(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.schemas
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    /// Validates the build configuration.
    ///
    /// # Errors
    /// Returns a configuration error for an empty schema selection, a blank
    /// schema name, an out-of-range depth, or an out-of-range concurrency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.schemas.is_empty() {
            return Err(SchemaNestError::configuration(
                "at least one schema must be selected",
            ));
        }

        if self.schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(SchemaNestError::configuration(
                "schema names cannot be empty",
            ));
        }

        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(SchemaNestError::configuration(format!(
                "max_depth {} exceeds the supported maximum of {}",
                self.max_depth, MAX_SUPPORTED_DEPTH
            )));
        }

        if self.max_concurrent_schemas == 0 || self.max_concurrent_schemas > MAX_CONCURRENT_SCHEMAS
        {
            return Err(SchemaNestError::configuration(format!(
                "max_concurrent_schemas must be between 1 and {}",
                MAX_CONCURRENT_SCHEMAS
            )));
        }

        Ok(())
    }
}

//! Project configuration file.
//!
//! A small JSON file holding the settings of a previous run so the same
//! export can be repeated. Command-line flags override file values. The
//! database password is never written: it is stripped from the URL on save.

use std::path::{Path, PathBuf};

use schemanest_core::{BuildConfig, Result, SchemaNestError};
use serde::{Deserialize, Serialize};
use url::Url;

/// Output file used when neither the flags nor the file name one.
pub const DEFAULT_OUTPUT: &str = "database_structure.json";

/// Persisted settings for one database export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Connection URL; stored without password
    pub database_url: Option<String>,
    /// Schemas to export
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    /// Maximum nesting depth
    pub max_depth: Option<u32>,
    /// Indent the output
    pub pretty: Option<bool>,
    /// Output file
    pub output: Option<PathBuf>,
}

impl ProjectConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a serialization
    /// error if it is not valid JSON for this structure.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SchemaNestError::Io {
                context: format!("Failed to read config file {}", path.display()),
                source,
            })?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|source| SchemaNestError::Serialization {
                context: format!("Invalid config file {}", path.display()),
                source,
            })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration with the password removed from the URL.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.without_password()).map_err(|source| {
            SchemaNestError::Serialization {
                context: "Failed to serialize configuration".to_string(),
                source,
            }
        })?;

        tokio::fs::write(path, json)
            .await
            .map_err(|source| SchemaNestError::Io {
                context: format!("Failed to write config file {}", path.display()),
                source,
            })?;

        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Copy of this configuration safe to persist.
    pub fn without_password(&self) -> Self {
        Self {
            database_url: self.database_url.as_deref().map(strip_password),
            ..self.clone()
        }
    }

    /// Layers `overrides` on top of `self`; set fields in `overrides` win.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            database_url: overrides.database_url.or(self.database_url),
            schemas: if overrides.schemas.is_empty() {
                self.schemas
            } else {
                overrides.schemas
            },
            max_depth: overrides.max_depth.or(self.max_depth),
            pretty: overrides.pretty.or(self.pretty),
            output: overrides.output.or(self.output),
        }
    }

    /// Pipeline settings derived from this configuration.
    pub fn build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::new(self.schemas.clone());
        if let Some(max_depth) = self.max_depth {
            config = config.with_max_depth(max_depth);
        }
        if let Some(pretty) = self.pretty {
            config = config.with_pretty(pretty);
        }
        config
    }

    /// Output file, or [`DEFAULT_OUTPUT`].
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }
}

/// Removes the password component of a database URL.
///
/// Strings that are not URLs, or cannot carry credentials, are returned
/// unchanged.
pub fn strip_password(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(None).is_ok() {
                url.to_string()
            } else {
                database_url.to_string()
            }
        }
        _ => database_url.to_string(),
    }
}

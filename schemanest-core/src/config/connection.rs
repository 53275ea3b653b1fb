//! Database connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SchemaNestError;

/// Configuration for database connections.
///
/// # Security
/// This struct intentionally does NOT store passwords or credentials.
///
/// # Example
/// ```rust
/// use schemanest_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(5432)
///     .with_database("mydb".to_string())
///     .with_username("admin".to_string());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address, or the file path for SQLite
    pub host: String,
    /// Database port (defaults per engine)
    pub port: Option<u16>,
    /// Database name
    pub database: Option<String>,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Per-statement timeout; also bounds each schema inspection
    pub query_timeout: Duration,
    /// Maximum pool size
    pub max_connections: u32,
    /// Open sessions read-only
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            max_connections: 5,
            read_only: true,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{}{})",
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Username is omitted on purpose
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(SchemaNestError::configuration("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(SchemaNestError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.max_connections == 0 {
            return Err(SchemaNestError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(SchemaNestError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(SchemaNestError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(SchemaNestError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with safe defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    /// Builder method to set query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, None);
        assert_eq!(config.max_connections, 5);
        assert!(config.read_only);
    }

    #[test]
    fn test_connection_config_validation() {
        assert!(ConnectionConfig::new("localhost".to_string()).validate().is_ok());

        let config = ConnectionConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig {
            port: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_max_connections(101);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_query_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_display_no_credentials() {
        let config = ConnectionConfig::new("example.com".to_string())
            .with_port(5432)
            .with_database("testdb".to_string())
            .with_username("testuser".to_string());

        let display = format!("{}", config);

        assert!(display.contains("example.com"));
        assert!(display.contains("5432"));
        assert!(display.contains("testdb"));
        assert!(!display.contains("testuser"));
    }
}

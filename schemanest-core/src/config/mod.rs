//! Configuration types for inspection and document building.
//!
//! - `ConnectionConfig`: connection and pool settings derived from the URL
//! - `BuildConfig`: selected schemas, depth bound, output formatting
//!
//! # Security
//! Neither struct stores a password. Credentials live only in the connection
//! string handed to the inspector factory.

mod build;
mod connection;

pub use build::{BuildConfig, DEFAULT_MAX_DEPTH, MAX_CONCURRENT_SCHEMAS, MAX_SUPPORTED_DEPTH};
pub use connection::ConnectionConfig;

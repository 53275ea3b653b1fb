//! Database URL resolution and password input.
//!
//! # Security
//! - The prompted password lives only in a [`Zeroizing`] buffer
//! - It is injected into the URL in memory; nothing is persisted
//! - URLs are only ever logged redacted

use schemanest_core::{Result, SchemaNestError, redact_database_url};
use url::Url;
use zeroize::Zeroizing;

/// Returns the connection URL to use, prompting for a password if asked.
///
/// # Errors
/// Returns a configuration error if no URL is available, or if a password
/// was requested for a URL that cannot carry one.
pub fn resolve_database_url(
    database_url: Option<&str>,
    ask_password: bool,
) -> Result<Zeroizing<String>> {
    let database_url = database_url.ok_or_else(|| {
        SchemaNestError::configuration(
            "Database URL is required. Pass --database-url, set DATABASE_URL, or use --config",
        )
    })?;

    tracing::debug!("Using database {}", redact_database_url(database_url));

    if ask_password {
        let password = prompt_password()?;
        inject_password(database_url, &password)
    } else {
        Ok(Zeroizing::new(database_url.to_string()))
    }
}

/// Sets the password component of `database_url`.
///
/// # Errors
/// Returns a configuration error if the URL is malformed or has no host.
pub fn inject_password(database_url: &str, password: &str) -> Result<Zeroizing<String>> {
    let mut url = Url::parse(database_url).map_err(|e| {
        SchemaNestError::configuration(format!(
            "Invalid database URL {}: {}",
            redact_database_url(database_url),
            e
        ))
    })?;

    url.set_password(Some(password)).map_err(|()| {
        SchemaNestError::configuration(format!(
            "Database URL {} cannot carry a password",
            redact_database_url(database_url)
        ))
    })?;

    Ok(Zeroizing::new(url.into()))
}

fn prompt_password() -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password("Database password: ").map_err(|source| {
        SchemaNestError::Io {
            context: "Failed to read password".to_string(),
            source,
        }
    })?;
    let password = Zeroizing::new(password);

    if password.is_empty() {
        return Err(SchemaNestError::configuration("Password cannot be empty"));
    }

    Ok(password)
}

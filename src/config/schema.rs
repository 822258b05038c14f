//! config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$PATHWAYS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/pathways/config.toml`
//! 3. `~/.pathways/config.toml` (canonical location)
//!
//! # Validation
//!
//! Values are validated after parsing and after environment overrides are
//! applied, so a bad environment variable is reported the same way as a bad
//! file entry.

use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration file contents.
///
/// Every field is optional; missing values fall back to environment
/// overrides and then to built-in defaults.
///
/// # Example
///
/// ```toml
/// api_url = "https://pathways.example.org/api"
///
/// [keycloak]
/// url = "https://sso.example.org"
/// realm = "pathways"
/// client_id = "pathways-frontend"
///
/// [secrets]
/// path = "/home/alice/.pathways/secrets.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the backend API the authenticated screens talk to.
    pub api_url: Option<String>,

    /// Identity provider settings.
    pub keycloak: Option<KeycloakConfig>,

    /// Secret storage settings.
    pub secrets: Option<SecretsConfig>,
}

/// Identity provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server.
    pub url: Option<String>,

    /// Realm name.
    pub realm: Option<String>,

    /// Public client identifier.
    pub client_id: Option<String>,
}

/// Secret storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Path of the secrets file (default: `~/.pathways/secrets.toml`).
    pub path: Option<PathBuf>,
}

/// Check that a value is an absolute http(s) URL.
pub(crate) fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidValue(format!("{} '{}' is not a URL: {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidValue(format!(
            "{} '{}' must use http or https, not '{}'",
            field, value, other
        ))),
    }
}

/// Check that an identifier is non-empty and free of whitespace.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue(format!("{} must not be empty", field)));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue(format!(
            "{} '{}' must not contain whitespace",
            field, value
        )));
    }
    Ok(())
}

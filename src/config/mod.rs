//! config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables
//!
//! Configuration is read once at startup; nothing watches it afterwards.
//!
//! # Environment
//!
//! | Variable                      | Setting              | Default                  |
//! |-------------------------------|----------------------|--------------------------|
//! | `PATHWAYS_API_URL`            | backend API base URL | `http://localhost:8000`  |
//! | `PATHWAYS_KEYCLOAK_URL`       | identity provider    | `http://localhost:8080`  |
//! | `PATHWAYS_KEYCLOAK_REALM`     | realm name           | `pathways`               |
//! | `PATHWAYS_KEYCLOAK_CLIENT_ID` | client identifier    | `pathways-frontend`      |
//!
//! # Example
//!
//! ```no_run
//! use pathways::config::Config;
//!
//! let result = Config::load().unwrap();
//! let config = result.config;
//! println!("Realm: {}", config.realm());
//! ```

pub mod schema;

pub use schema::{FileConfig, KeycloakConfig, SecretsConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default backend API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default identity provider base URL.
pub const DEFAULT_KEYCLOAK_URL: &str = "http://localhost:8080";

/// Default realm name.
pub const DEFAULT_REALM: &str = "pathways";

/// Default public client identifier.
pub const DEFAULT_CLIENT_ID: &str = "pathways-frontend";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PATHWAYS_CONFIG";

const API_URL_ENV: &str = "PATHWAYS_API_URL";
const KEYCLOAK_URL_ENV: &str = "PATHWAYS_KEYCLOAK_URL";
const REALM_ENV: &str = "PATHWAYS_KEYCLOAK_REALM";
const CLIENT_ID_ENV: &str = "PATHWAYS_KEYCLOAK_CLIENT_ID";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The resolved configuration.
    pub config: Config,
    /// Path of the config file that was read, if any.
    pub path: Option<PathBuf>,
}

/// Values taken from the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub keycloak_url: Option<String>,
    pub realm: Option<String>,
    pub client_id: Option<String>,
}

impl EnvOverrides {
    /// Read overrides through a lookup function.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_url: get(API_URL_ENV),
            keycloak_url: get(KEYCLOAK_URL_ENV),
            realm: get(REALM_ENV),
            client_id: get(CLIENT_ID_ENV),
        }
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Resolved configuration.
///
/// Accessors apply precedence rules: environment over file over defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file.
    pub file: FileConfig,
    /// Values read from the environment.
    pub env: EnvOverrides,
}

impl Config {
    /// Load configuration from the default file locations and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// any resolved value is invalid. A missing config file is not an error.
    pub fn load() -> Result<ConfigLoadResult, ConfigError> {
        let (file, path) = Self::load_file()?;
        let config = Self::from_parts(file, EnvOverrides::from_env())?;
        Ok(ConfigLoadResult { config, path })
    }

    /// Build a configuration from already-read sources and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any resolved value is invalid.
    pub fn from_parts(file: FileConfig, env: EnvOverrides) -> Result<Self, ConfigError> {
        let config = Self { file, env };
        config.validate()?;
        Ok(config)
    }

    fn load_file() -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        // 1. $PATHWAYS_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. $XDG_CONFIG_HOME/pathways/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("pathways/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. ~/.pathways/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".pathways/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((FileConfig::default(), None))
    }

    /// Read and parse a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        schema::validate_url("api_url", self.api_url())?;
        schema::validate_url("keycloak.url", self.keycloak_url())?;
        schema::validate_identifier("keycloak.realm", self.realm())?;
        schema::validate_identifier("keycloak.client_id", self.client_id())?;
        Ok(())
    }

    fn keycloak(&self) -> Option<&KeycloakConfig> {
        self.file.keycloak.as_ref()
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Backend API base URL.
    pub fn api_url(&self) -> &str {
        self.env
            .api_url
            .as_deref()
            .or(self.file.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Identity provider base URL, without a trailing slash.
    pub fn keycloak_url(&self) -> &str {
        self.env
            .keycloak_url
            .as_deref()
            .or_else(|| self.keycloak().and_then(|k| k.url.as_deref()))
            .unwrap_or(DEFAULT_KEYCLOAK_URL)
            .trim_end_matches('/')
    }

    /// Realm name.
    pub fn realm(&self) -> &str {
        self.env
            .realm
            .as_deref()
            .or_else(|| self.keycloak().and_then(|k| k.realm.as_deref()))
            .unwrap_or(DEFAULT_REALM)
    }

    /// Public client identifier.
    pub fn client_id(&self) -> &str {
        self.env
            .client_id
            .as_deref()
            .or_else(|| self.keycloak().and_then(|k| k.client_id.as_deref()))
            .unwrap_or(DEFAULT_CLIENT_ID)
    }

    /// Path of the secrets file.
    ///
    /// Defaults to `~/.pathways/secrets.toml`.
    pub fn secrets_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = self.file.secrets.as_ref().and_then(|s| s.path.clone()) {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".pathways").join("secrets.toml"))
    }
}

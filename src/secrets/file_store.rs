//! secrets::file_store
//!
//! File-based secret storage.
//!
//! # Security
//!
//! - Secrets live in a single TOML table (default `~/.pathways/secrets.toml`)
//! - The file is created with 0600 permissions on Unix
//! - Writes go to a sibling temp file which is then renamed over the original
//! - Secret values never appear in errors or logs

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use super::traits::{SecretError, SecretStore};

type SecretMap = BTreeMap<String, String>;

/// File-based secret storage.
///
/// Every operation re-reads the file, so two processes sharing a file see
/// each other's writes on the next call.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directory are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<SecretMap, SecretError> {
        if !self.path.exists() {
            return Ok(SecretMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read secrets file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SecretError::ReadError(format!("cannot parse secrets file: {}", e.message())))
    }

    fn write_map(&self, secrets: &SecretMap) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string(secrets)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize secrets: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&temp_path)
            .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| SecretError::WriteError(format!("cannot write secrets: {}", e)))?;
        file.sync_all()
            .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_map()?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_map(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_map()?;
        if secrets.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&secrets)
    }
}

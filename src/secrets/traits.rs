//! secrets::traits
//!
//! Secret storage trait definition.
//!
//! # Design
//!
//! `SecretStore` is a small key-value interface. Keys are namespaced
//! (e.g. `"keycloak.session.<realm>.<client>"`) so several identity
//! provider configurations can share one store.
//!
//! Implementations MUST never log, print, or include secret values in error
//! messages, and must be thread-safe.

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Error messages never include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),
}

/// Trait for secret storage providers.
pub trait SecretStore: Send + Sync {
    /// Get a secret by key.
    ///
    /// Returns `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Set a secret, replacing any existing value.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Delete a secret.
    ///
    /// Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    /// Check if a secret exists.
    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}

//! secrets::memory_store
//!
//! In-memory secret storage for sessions that must not outlive the process.

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::{SecretError, SecretStore};

/// Secret store that keeps values in process memory only.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SecretError::ReadError("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SecretError::WriteError("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SecretError::WriteError("memory store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_delete() {
        let store = MemorySecretStore::new();
        assert!(!store.exists("k").expect("exists"));

        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get"), Some("v".to_string()));

        store.delete("k").expect("delete");
        assert!(store.get("k").expect("get").is_none());
    }
}

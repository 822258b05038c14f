//! secrets
//!
//! Secret storage used internally by the identity provider client.
//!
//! # Architecture
//!
//! Secrets are stored through the [`SecretStore`] trait:
//!
//! - [`FileSecretStore`]: TOML file, `~/.pathways/secrets.toml` by default
//! - [`MemorySecretStore`]: process memory only
//!
//! The session controller never touches this module. Only the Keycloak
//! adapter uses it, to remember its token bundle between runs the way a
//! browser remembers an SSO cookie.
//!
//! # Example
//!
//! ```
//! use pathways::secrets::{MemorySecretStore, SecretStore};
//!
//! let store = MemorySecretStore::new();
//! store.set("keycloak.session.pathways", "{}").unwrap();
//! assert!(store.exists("keycloak.session.pathways").unwrap());
//! ```

mod file_store;
mod memory_store;
mod traits;

pub use file_store::FileSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore};

//! auth - identity provider boundary
//!
//! The session controller never talks to Keycloak directly. It consumes an
//! [`IdentityProvider`]: a handshake, login and logout commands, token
//! renewal, and an event stream. [`KeycloakClient`] is the production
//! implementation; tests substitute scripted fakes.
//!
//! # Events
//!
//! Providers report asynchronous lifecycle changes by sending
//! [`ProviderEvent`]s into the [`EventSink`] registered before the
//! handshake starts. Events are delivered in the order the provider
//! produced them.
//!
//! # Components
//!
//! - [`KeycloakClient`] - OpenID Connect client for one Keycloak realm
//! - [`DeviceFlowClient`] - HTTP client for the realm's endpoints
//! - [`TokenBundle`] - persisted tokens used to resume a session silently
//! - [`Credential`] - parsed access token claims
//!
//! # Security
//!
//! Tokens never appear in logs, errors, or `Debug` output.

mod credential;
mod device_flow;
mod errors;
mod keycloak;
mod token_bundle;

pub use credential::{Credential, RealmAccess};
pub use device_flow::{DeviceCodeResponse, DeviceFlowClient, TokenResponse};
pub use errors::AuthError;
pub use keycloak::{KeycloakClient, DEFAULT_SESSION_PROBE_INTERVAL};
pub use token_bundle::{
    BundleTimestamps, TokenBundle, TokenInfo, TOKEN_BUNDLE_KIND, TOKEN_BUNDLE_VERSION,
};

use tokio::sync::mpsc;

/// Lifecycle events a provider emits after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A credential was obtained (handshake, login or refresh).
    AuthSuccess,
    /// Authentication failed; carries a description without token data.
    AuthError(String),
    /// The access token reached its expiry.
    TokenExpired,
    /// The session ended, locally or at the identity provider.
    AuthLogout,
}

/// Channel end a provider sends its events into.
pub type EventSink = mpsc::UnboundedSender<ProviderEvent>;

/// What the handshake does when no session exists yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnLoad {
    /// Resume an existing session silently; never start a login.
    #[default]
    CheckSso,
    /// Start an interactive login when no session can be resumed.
    LoginRequired,
}

/// Handshake options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Behavior when no session exists.
    pub on_load: OnLoad,
    /// Periodically verify that the identity provider session is still
    /// alive and emit [`ProviderEvent::AuthLogout`] when it ends.
    pub check_login_iframe: bool,
}

impl InitOptions {
    /// Silent check without session monitoring.
    pub fn silent() -> Self {
        Self {
            on_load: OnLoad::CheckSso,
            check_login_iframe: false,
        }
    }
}

/// An OpenID Connect style identity provider client.
///
/// Commands resolve when the provider call finishes. Callers must not infer
/// session state from the return value alone; providers also emit the
/// matching [`ProviderEvent`].
///
/// # Example
///
/// ```ignore
/// use pathways::auth::{IdentityProvider, InitOptions};
///
/// let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
/// provider.register(tx);
/// let authenticated = provider.init(InitOptions::silent()).await?;
/// ```
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register the sink for lifecycle events, replacing any previous one.
    fn register(&self, sink: EventSink);

    /// Run the initial handshake.
    ///
    /// Returns whether a session is authenticated afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error when the handshake itself fails (for example the
    /// identity provider is unreachable).
    async fn init(&self, options: InitOptions) -> Result<bool, AuthError>;

    /// Start an interactive login.
    async fn login(&self) -> Result<(), AuthError>;

    /// End the session at the identity provider and locally.
    async fn logout(&self) -> Result<(), AuthError>;

    /// Renew the access token unless it stays valid for more than
    /// `min_validity_secs`.
    ///
    /// Returns `Ok(true)` when tokens were renewed and `Ok(false)` when the
    /// current token was still good.
    async fn update_token(&self, min_validity_secs: u64) -> Result<bool, AuthError>;

    /// Whether the provider currently holds a credential.
    fn authenticated(&self) -> bool;

    /// Claims of the current access token.
    fn token_parsed(&self) -> Option<Credential>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_bundle_kind_is_correct() {
        assert_eq!(TOKEN_BUNDLE_KIND, "pathways.keycloak-session");
    }

    #[test]
    fn token_bundle_version_is_one() {
        assert_eq!(TOKEN_BUNDLE_VERSION, 1);
    }

    #[test]
    fn silent_options_never_force_login() {
        let options = InitOptions::silent();
        assert_eq!(options.on_load, OnLoad::CheckSso);
        assert!(!options.check_login_iframe);
        assert_eq!(options, InitOptions::default());
    }
}

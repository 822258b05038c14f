//! session - authoritative session state
//!
//! One [`SessionController`] owns one [`Session`]. The controller is the only
//! caller of the identity provider and the only writer of the session;
//! everyone else reads immutable snapshots or subscribes to changes.
//!
//! # Invariants
//!
//! - a role other than [`Role::Public`] implies `authenticated`
//! - [`Readiness::NotStarted`] implies unauthenticated and public
//!
//! Both hold by construction: the only way to change `authenticated` or
//! `role` is [`Session::with_credential`] / [`Session::signed_out`].

mod controller;
mod role;

pub use controller::{SessionController, SessionFailure, HANDSHAKE_TIMEOUT, MIN_VALIDITY_SECS};
pub use role::Role;

use serde::Serialize;

use crate::auth::Credential;

/// Whether the first identity provider handshake has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// The controller has not been started.
    #[default]
    NotStarted,
    /// The handshake is in flight.
    Initializing,
    /// The handshake finished, successfully or not.
    Ready,
}

/// Authentication and authorization state of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    readiness: Readiness,
    authenticated: bool,
    role: Role,
    username: Option<String>,
    provider_attached: bool,
}

impl Session {
    /// Session of a controller that has not started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handshake progress.
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Check if the first handshake has finished.
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Whether a valid credential exists.
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    /// Derived access tier.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Login name from the credential, when authenticated.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether the controller holds an identity provider handle.
    pub fn has_provider(&self) -> bool {
        self.provider_attached
    }

    /// Copy with authentication state taken from a provider.
    ///
    /// A credential only counts when the provider also reports itself
    /// authenticated.
    pub fn with_credential(&self, authenticated: bool, credential: Option<&Credential>) -> Self {
        match credential.filter(|_| authenticated) {
            Some(credential) => Self {
                authenticated: true,
                role: Role::derive(credential),
                username: credential.preferred_username.clone(),
                ..self.clone()
            },
            None if authenticated => Self {
                authenticated: true,
                role: Role::Public,
                username: None,
                ..self.clone()
            },
            None => self.signed_out(),
        }
    }

    /// Copy with no credential.
    pub fn signed_out(&self) -> Self {
        Self {
            authenticated: false,
            role: Role::Public,
            username: None,
            ..self.clone()
        }
    }

    /// Copy marked as handshaking with an attached provider.
    pub fn initializing(&self) -> Self {
        Self {
            readiness: Readiness::Initializing,
            provider_attached: true,
            ..self.clone()
        }
    }

    /// Copy marked as past the first handshake.
    pub fn ready(&self) -> Self {
        Self {
            readiness: Readiness::Ready,
            ..self.clone()
        }
    }
}

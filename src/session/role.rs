//! session::role
//!
//! Coarse access tier derived from a credential.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::auth::Credential;

/// Access tier used for route gating.
///
/// Derived from the credential's realm roles; never set directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No recognized role, or not authenticated.
    #[default]
    Public,
    /// Clinician using the chat.
    Practitioner,
    /// Human resources staff.
    Hr,
    /// Administrator.
    Admin,
}

impl Role {
    /// Every role, least privileged first.
    pub const ALL: [Role; 4] = [Role::Public, Role::Practitioner, Role::Hr, Role::Admin];

    /// Map a realm role name to a role.
    ///
    /// Returns `None` for names outside the closed set, including
    /// `"public"`, which is never granted by a claim.
    pub fn from_claim(name: &str) -> Option<Self> {
        match name {
            "practitioner" => Some(Role::Practitioner),
            "hr" => Some(Role::Hr),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Derive the role from a credential.
    ///
    /// Only the first realm role is consulted. Later entries are ignored
    /// even when the first one is not recognized.
    ///
    /// # Example
    ///
    /// ```
    /// use pathways::auth::Credential;
    /// use pathways::session::Role;
    ///
    /// assert_eq!(Role::derive(&Credential::with_realm_roles(["hr", "admin"])), Role::Hr);
    /// assert_eq!(Role::derive(&Credential::default()), Role::Public);
    /// ```
    pub fn derive(credential: &Credential) -> Self {
        credential
            .realm_roles()
            .first()
            .and_then(|name| Role::from_claim(name))
            .unwrap_or(Role::Public)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Practitioner => "practitioner",
            Role::Hr => "hr",
            Role::Admin => "admin",
        }
    }

    /// Check for the public tier.
    pub fn is_public(&self) -> bool {
        *self == Role::Public
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Role::Public),
            other => Role::from_claim(other).ok_or_else(|| format!("unknown role '{}'", other)),
        }
    }
}

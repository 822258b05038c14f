//! auth::credential
//!
//! Parsed view of an access token.
//!
//! The client never verifies token signatures; the backend does that. The
//! payload is only read to learn who the user is and which realm roles the
//! identity provider assigned, the same way a browser client reads
//! `tokenParsed`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::errors::AuthError;

/// Claims read from an access token payload.
///
/// Unknown claims are ignored. All fields are optional because identity
/// providers differ in what they put into access tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Human-readable login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Realm-level role assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RealmAccess>,
}

/// The `realm_access` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    /// Role names in the order the identity provider listed them.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Credential {
    /// Decode the payload segment of a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is not three
    /// dot-separated segments or the payload is not base64url JSON.
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::InvalidToken(
                    "expected three dot-separated segments".into(),
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::InvalidToken(format!("payload is not valid claims: {}", e)))
    }

    /// Build a credential carrying only realm roles.
    pub fn with_realm_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            realm_access: Some(RealmAccess {
                roles: roles.into_iter().map(Into::into).collect(),
            }),
            ..Self::default()
        }
    }

    /// Realm roles, empty when the claim is absent.
    pub fn realm_roles(&self) -> &[String] {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }
}

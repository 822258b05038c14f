//! auth::token_bundle
//!
//! Token bundle schema for Keycloak sessions.
//!
//! # Design
//!
//! The bundle is the Keycloak adapter's private memory of a session. It is
//! serialized as JSON into the secret store so a later run can silently
//! resume the session, the way a browser resumes one from an SSO cookie.
//!
//! It stores:
//! - kind, schema_version, issuer, client_id
//! - tokens (access, refresh, optional id token, expiries)
//! - timestamps (created_at, updated_at)
//!
//! # Security
//!
//! `Debug` is implemented by hand and redacts every token value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::device_flow::TokenResponse;
use super::errors::AuthError;

/// Kind identifier for token bundles.
pub const TOKEN_BUNDLE_KIND: &str = "pathways.keycloak-session";

/// Current schema version for token bundles.
pub const TOKEN_BUNDLE_VERSION: u32 = 1;

/// Token bundle stored in the secret store.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenBundle {
    /// Bundle type identifier.
    pub kind: String,

    /// Schema version for forward compatibility.
    pub schema_version: u32,

    /// Realm issuer URL (`{url}/realms/{realm}`).
    pub issuer: String,

    /// Client the tokens were issued to.
    pub client_id: String,

    /// Tokens with expiration times.
    pub tokens: TokenInfo,

    /// Bundle timestamps.
    pub timestamps: BundleTimestamps,
}

/// OAuth token information.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Access token (compact JWT).
    pub access_token: String,

    /// When the access token expires.
    pub access_token_expires_at: DateTime<Utc>,

    /// Refresh token.
    pub refresh_token: String,

    /// When the refresh token expires; `None` for offline tokens.
    pub refresh_token_expires_at: Option<DateTime<Utc>>,

    /// OpenID Connect id token, when the `openid` scope was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Bundle creation and update timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleTimestamps {
    /// When the bundle was first created (login).
    pub created_at: DateTime<Utc>,

    /// When the bundle was last updated (token refresh).
    pub updated_at: DateTime<Utc>,
}

impl TokenBundle {
    /// Create a new token bundle.
    pub fn new(issuer: &str, client_id: &str, tokens: TokenInfo) -> Self {
        let now = Utc::now();
        Self {
            kind: TOKEN_BUNDLE_KIND.to_string(),
            schema_version: TOKEN_BUNDLE_VERSION,
            issuer: issuer.to_string(),
            client_id: client_id.to_string(),
            tokens,
            timestamps: BundleTimestamps {
                created_at: now,
                updated_at: now,
            },
        }
    }

    /// Secret store key for an issuer and client.
    ///
    /// # Example
    ///
    /// ```
    /// use pathways::auth::TokenBundle;
    ///
    /// assert_eq!(
    ///     TokenBundle::secret_key("http://localhost:8080/realms/pathways", "pathways-frontend"),
    ///     "keycloak.session.http://localhost:8080/realms/pathways#pathways-frontend"
    /// );
    /// ```
    pub fn secret_key(issuer: &str, client_id: &str) -> String {
        format!("keycloak.session.{}#{}", issuer, client_id)
    }

    /// Check if the access token stays valid for more than `min_validity_secs`.
    pub fn is_valid_for(&self, min_validity_secs: u64) -> bool {
        Utc::now()
            .checked_add_signed(seconds(min_validity_secs))
            .is_some_and(|deadline| deadline < self.tokens.access_token_expires_at)
    }

    /// Check if the refresh token has expired.
    ///
    /// Offline tokens without an expiry never report expired here; the
    /// identity provider still rejects them once revoked.
    pub fn is_refresh_token_expired(&self) -> bool {
        self.tokens
            .refresh_token_expires_at
            .is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Parse a token bundle from JSON.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidBundle` if parsing fails or the kind or
    /// schema version is not recognized.
    pub fn parse(json: &str) -> Result<Self, AuthError> {
        let bundle: Self = serde_json::from_str(json)?;

        if bundle.kind != TOKEN_BUNDLE_KIND {
            return Err(AuthError::InvalidBundle(format!(
                "unexpected kind '{}', expected '{}'",
                bundle.kind, TOKEN_BUNDLE_KIND
            )));
        }

        if bundle.schema_version != TOKEN_BUNDLE_VERSION {
            return Err(AuthError::InvalidBundle(format!(
                "unsupported schema version {}, expected {}",
                bundle.schema_version, TOKEN_BUNDLE_VERSION
            )));
        }

        Ok(bundle)
    }

    /// Serialize the token bundle to JSON.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidBundle` if serialization fails.
    pub fn to_json(&self) -> Result<String, AuthError> {
        serde_json::to_string_pretty(self).map_err(|e| AuthError::InvalidBundle(e.to_string()))
    }

    /// Copy of this bundle carrying refreshed tokens.
    ///
    /// Keycloak may omit a new id token on refresh; the previous one is kept.
    pub fn with_refreshed_tokens(&self, mut tokens: TokenInfo) -> Self {
        if tokens.id_token.is_none() {
            tokens.id_token = self.tokens.id_token.clone();
        }
        Self {
            tokens,
            timestamps: BundleTimestamps {
                created_at: self.timestamps.created_at,
                updated_at: Utc::now(),
            },
            ..self.clone()
        }
    }
}

impl TokenInfo {
    /// Build token info from a token endpoint response.
    ///
    /// A `refresh_expires_in` of zero or absent means the refresh token has no
    /// expiry of its own.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DeviceFlowError` if the response has no refresh
    /// token; a session cannot be resumed without one.
    pub fn from_response(response: &TokenResponse) -> Result<Self, AuthError> {
        let refresh_token = response
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::DeviceFlowError("token response has no refresh token".into()))?;

        let now = Utc::now();
        let refresh_token_expires_at = response
            .refresh_expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| now + seconds(secs));

        Ok(Self {
            access_token: response.access_token.clone(),
            access_token_expires_at: now + seconds(response.expires_in),
            refresh_token,
            refresh_token_expires_at,
            id_token: response.id_token.clone(),
        })
    }
}

fn seconds(secs: u64) -> Duration {
    // Clamp to a span chrono can represent; anything that long is "forever".
    const MAX_SECS: i64 = 100 * 365 * 24 * 60 * 60;
    Duration::seconds(i64::try_from(secs).unwrap_or(MAX_SECS).min(MAX_SECS))
}

// Custom Debug implementations to redact tokens

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("kind", &self.kind)
            .field("schema_version", &self.schema_version)
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("tokens", &self.tokens)
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"[REDACTED]")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

//! auth::errors
//!
//! Identity provider error types.
//!
//! Error messages never contain token values; variants carry the issuer,
//! an OAuth error code, or a transport message instead.
//!
//! # Example
//!
//! ```
//! use pathways::auth::AuthError;
//!
//! let err = AuthError::Expired("http://localhost:8080/realms/pathways".to_string());
//! assert!(!err.is_transient());
//! assert!(err.to_string().contains("pathways login"));
//! ```

use thiserror::Error;

/// Errors from identity provider operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session exists for the issuer.
    #[error("not authenticated with '{0}'. Run 'pathways login'.")]
    NotAuthenticated(String),

    /// The session (refresh token) has expired or was revoked.
    #[error("session expired for '{0}'. Run 'pathways login' again.")]
    Expired(String),

    /// Token refresh failed for a reason other than expiry.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// Device authorization flow failed.
    #[error("device flow error: {0}")]
    DeviceFlowError(String),

    /// The user denied the authorization request.
    #[error("authentication cancelled by user")]
    Cancelled,

    /// The device code expired before the user approved it.
    #[error("device code expired. Please try again.")]
    DeviceFlowExpired,

    /// Logout at the identity provider failed.
    #[error("logout failed: {0}")]
    LogoutFailed(String),

    /// A token could not be decoded.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The stored token bundle is invalid or cannot be parsed.
    #[error("invalid token bundle: {0}")]
    InvalidBundle(String),

    /// Error from secret storage.
    #[error("secret store error: {0}")]
    SecretStore(String),

    /// Network error talking to the identity provider.
    #[error("network error: {0}")]
    Network(String),

    /// The identity provider answered with an unexpected status.
    #[error("identity provider error: {status} - {message}")]
    ProviderApi {
        /// HTTP status code
        status: u16,
        /// Response body or error description
        message: String,
    },

    /// Internal error (should not happen).
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Check if this error is a transient failure that might succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Network(_) => true,
            AuthError::ProviderApi { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<crate::secrets::SecretError> for AuthError {
    fn from(err: crate::secrets::SecretError) -> Self {
        AuthError::SecretStore(err.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::InvalidBundle(err.to_string())
    }
}

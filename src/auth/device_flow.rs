//! auth::device_flow
//!
//! OpenID Connect endpoint client for a Keycloak realm.
//!
//! # Device Flow Overview
//!
//! Login uses the OAuth 2.0 device authorization grant, which needs neither a
//! client secret nor a local callback server:
//!
//! 1. Request a device code from `/auth/device`
//! 2. The user opens the verification URL and approves
//! 3. Poll `/token` until the approval lands
//! 4. Receive access, refresh and id tokens
//!
//! # Polling States
//!
//! While polling, the token endpoint answers with one of:
//! - `authorization_pending` - keep polling
//! - `slow_down` - add 5 seconds to the interval
//! - `expired_token` - the device code expired, start over
//! - `access_denied` - the user refused
//!
//! # Other Endpoints
//!
//! - `/token` with `grant_type=refresh_token` renews tokens
//! - `/logout` ends the server-side session for a refresh token
//! - `/userinfo` is probed to detect a session ended elsewhere

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::errors::AuthError;

/// Scopes requested at login.
const DEFAULT_SCOPES: &str = "openid profile";

/// User-Agent header for identity provider requests.
const USER_AGENT: &str = concat!("pathways/", env!("CARGO_PKG_VERSION"));

/// Polling interval when the provider does not suggest one.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Bounds applied to the polling interval the provider suggests.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Longest device code lifetime honored, whatever the provider claims.
const MAX_DEVICE_CODE_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Time allowed to establish a connection to the provider.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for a whole request, response body included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Response from the device authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    /// The device verification code.
    pub device_code: String,

    /// The user verification code to display.
    pub user_code: String,

    /// The verification URL the user should visit.
    pub verification_uri: String,

    /// Verification URL with the user code already filled in.
    #[serde(default)]
    pub verification_uri_complete: Option<String>,

    /// Seconds until the device code expires.
    pub expires_in: u64,

    /// Minimum polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl DeviceCodeResponse {
    /// The URL to show the user, preferring the pre-filled one.
    pub fn browser_url(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

/// Successful response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token (compact JWT).
    pub access_token: String,

    /// Token type (`Bearer`).
    pub token_type: String,

    /// Seconds until the access token expires.
    pub expires_in: u64,

    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Seconds until the refresh token expires; zero for offline tokens.
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,

    /// OpenID Connect id token.
    #[serde(default)]
    pub id_token: Option<String>,

    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error response from OAuth endpoints.
#[derive(Debug, Clone, Deserialize)]
struct OAuthError {
    error: String,
    error_description: Option<String>,
}

impl OAuthError {
    fn describe(self) -> String {
        match self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error,
        }
    }
}

#[derive(Serialize)]
struct DeviceCodeRequest<'a> {
    client_id: &'a str,
    scope: &'a str,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    client_id: &'a str,
    refresh_token: &'a str,
}

/// Client for one realm's OpenID Connect endpoints.
#[derive(Debug, Clone)]
pub struct DeviceFlowClient {
    client: Client,
    /// `{url}/realms/{realm}`
    issuer: String,
    client_id: String,
}

impl DeviceFlowClient {
    /// Create a client for `realm` on the Keycloak server at `base_url`.
    pub fn new(base_url: &str, realm: &str, client_id: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "falling back to an HTTP client without timeouts");
                Client::new()
            });

        Self {
            client,
            issuer: format!("{}/realms/{}", base_url.trim_end_matches('/'), realm),
            client_id: client_id.to_string(),
        }
    }

    /// Realm issuer URL.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/protocol/openid-connect/{}", self.issuer, path)
    }

    fn device_code_url(&self) -> String {
        self.endpoint("auth/device")
    }

    fn token_url(&self) -> String {
        self.endpoint("token")
    }

    fn logout_url(&self) -> String {
        self.endpoint("logout")
    }

    fn userinfo_url(&self) -> String {
        self.endpoint("userinfo")
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(USER_AGENT),
        );
        headers
    }

    /// Request a device code to begin the authorization flow.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DeviceFlowError`] if the provider refuses the request
    /// - [`AuthError::Network`] if there's a network error
    pub async fn request_device_code(&self) -> Result<DeviceCodeResponse, AuthError> {
        let request = DeviceCodeRequest {
            client_id: &self.client_id,
            scope: DEFAULT_SCOPES,
        };

        let response = self
            .client
            .post(self.device_code_url())
            .headers(self.headers())
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                AuthError::DeviceFlowError(format!("failed to parse device code response: {}", e))
            });
        }

        match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) => Err(AuthError::DeviceFlowError(err.describe())),
            Err(_) => Err(AuthError::ProviderApi {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    /// Poll until the user approves, denies, or the device code expires.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Cancelled`] if the user denies authorization
    /// - [`AuthError::DeviceFlowExpired`] if the device code expires
    /// - [`AuthError::Network`] if there's a network error
    pub async fn poll_for_token(
        &self,
        device_code: &DeviceCodeResponse,
    ) -> Result<TokenResponse, AuthError> {
        let deadline = poll_deadline(Instant::now(), device_code.expires_in);
        let mut interval = poll_interval(device_code.interval);

        loop {
            if Instant::now() >= deadline {
                return Err(AuthError::DeviceFlowExpired);
            }

            sleep(interval).await;

            match self.poll_once(&device_code.device_code).await {
                Ok(tokens) => return Ok(tokens),
                Err(PollResult::Pending) => {}
                Err(PollResult::SlowDown) => {
                    interval = (interval + Duration::from_secs(5)).min(MAX_POLL_INTERVAL);
                    debug!(interval_secs = interval.as_secs(), "device flow asked to slow down");
                }
                Err(PollResult::Expired) => return Err(AuthError::DeviceFlowExpired),
                Err(PollResult::AccessDenied) => return Err(AuthError::Cancelled),
                Err(PollResult::Error(e)) => return Err(e),
            }
        }
    }

    async fn poll_once(&self, device_code: &str) -> Result<TokenResponse, PollResult> {
        let request = TokenRequest {
            client_id: &self.client_id,
            grant_type: "urn:ietf:params:oauth:grant-type:device_code",
            device_code: Some(device_code),
            refresh_token: None,
        };

        let response = self
            .client
            .post(self.token_url())
            .headers(self.headers())
            .form(&request)
            .send()
            .await
            .map_err(|e| PollResult::Error(AuthError::Network(e.to_string())))?;

        let body = response
            .text()
            .await
            .map_err(|e| PollResult::Error(AuthError::Network(e.to_string())))?;

        if let Ok(tokens) = serde_json::from_str::<TokenResponse>(&body) {
            return Ok(tokens);
        }

        match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) => match err.error.as_str() {
                "authorization_pending" => Err(PollResult::Pending),
                "slow_down" => Err(PollResult::SlowDown),
                "expired_token" => Err(PollResult::Expired),
                "access_denied" => Err(PollResult::AccessDenied),
                _ => Err(PollResult::Error(AuthError::DeviceFlowError(err.describe()))),
            },
            Err(_) => Err(PollResult::Error(AuthError::DeviceFlowError(
                "unexpected token endpoint response".into(),
            ))),
        }
    }

    /// Exchange a refresh token for new tokens.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Expired`] if the refresh token is expired or revoked
    /// - [`AuthError::RefreshFailed`] for any other OAuth error
    /// - [`AuthError::Network`] if there's a network error
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let request = TokenRequest {
            client_id: &self.client_id,
            grant_type: "refresh_token",
            device_code: None,
            refresh_token: Some(refresh_token),
        };

        let response = self
            .client
            .post(self.token_url())
            .headers(self.headers())
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                AuthError::RefreshFailed(format!("failed to parse token response: {}", e))
            });
        }

        match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) if err.error == "invalid_grant" => Err(AuthError::Expired(self.issuer.clone())),
            Ok(err) => Err(AuthError::RefreshFailed(err.describe())),
            Err(_) => Err(AuthError::ProviderApi {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    /// End the server-side session bound to a refresh token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LogoutFailed`] if the provider rejects the request
    /// - [`AuthError::Network`] if there's a network error
    pub async fn end_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        let request = LogoutRequest {
            client_id: &self.client_id,
            refresh_token,
        };

        let response = self
            .client
            .post(self.logout_url())
            .headers(self.headers())
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<OAuthError>(&body) {
            // The session is already gone; that is what logout wanted.
            Ok(err) if err.error == "invalid_grant" => Ok(()),
            Ok(err) => Err(AuthError::LogoutFailed(err.describe())),
            Err(_) => Err(AuthError::LogoutFailed(format!("status {}", status.as_u16()))),
        }
    }

    /// Check whether the server still accepts an access token.
    ///
    /// Returns `Ok(false)` when the provider answers 401, meaning the session
    /// behind the token has ended.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProviderApi`] for any other non-success status
    /// - [`AuthError::Network`] if there's a network error
    pub async fn session_active(&self, access_token: &str) -> Result<bool, AuthError> {
        let response = self
            .client
            .get(self.userinfo_url())
            .headers(self.headers())
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            status => Err(AuthError::ProviderApi {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// Internal polling result states.
enum PollResult {
    Pending,
    SlowDown,
    Expired,
    AccessDenied,
    Error(AuthError),
}

/// When polling gives up, for a device code valid `expires_in` seconds.
fn poll_deadline(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in).min(MAX_DEVICE_CODE_LIFETIME);
    now.checked_add(lifetime).unwrap_or(now)
}

/// Polling interval for a suggested `interval_secs`.
fn poll_interval(interval_secs: u64) -> Duration {
    Duration::from_secs(interval_secs).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
}

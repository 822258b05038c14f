//! auth::keycloak
//!
//! [`IdentityProvider`] implementation for a Keycloak realm.
//!
//! # Session Lifecycle
//!
//! - `init` resumes a stored session silently, renewing the access token
//!   when it is about to expire
//! - `login` runs the device authorization grant
//! - `logout` ends the server-side session and forgets the stored bundle
//! - `update_token` renews tokens when they fall below a validity threshold
//!
//! Every change of tokens reschedules an expiry timer that emits
//! [`ProviderEvent::TokenExpired`]. With `check_login_iframe` the client also
//! probes `/userinfo` periodically and emits [`ProviderEvent::AuthLogout`]
//! once the identity provider no longer knows the session.
//!
//! # Example
//!
//! ```ignore
//! use pathways::auth::{IdentityProvider, InitOptions, KeycloakClient};
//! use pathways::secrets::FileSecretStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileSecretStore::new("/home/alice/.pathways/secrets.toml"));
//! let client = KeycloakClient::new("http://localhost:8080", "pathways", "pathways-frontend", store);
//! let authenticated = client.init(InitOptions::silent()).await?;
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use super::credential::Credential;
use super::device_flow::{DeviceCodeResponse, DeviceFlowClient, TokenResponse};
use super::errors::AuthError;
use super::token_bundle::{TokenBundle, TokenInfo};
use super::{EventSink, IdentityProvider, InitOptions, OnLoad, ProviderEvent};
use crate::secrets::SecretStore;

/// How often the session probe asks the identity provider about the session.
pub const DEFAULT_SESSION_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Validity a resumed access token must have before it is used as is.
const RESUME_MIN_VALIDITY_SECS: u64 = 30;

type Prompt = Box<dyn Fn(&DeviceCodeResponse) + Send + Sync>;

/// Keycloak OpenID Connect client.
pub struct KeycloakClient {
    flow: DeviceFlowClient,
    state: Arc<SessionState>,
    prompt: Prompt,
    probe_interval: Duration,
    session_probe: Mutex<Option<JoinHandle<()>>>,
}

/// Token state shared with the background timer and probe tasks.
struct SessionState {
    issuer: String,
    client_id: String,
    store: Arc<dyn SecretStore>,
    bundle: RwLock<Option<TokenBundle>>,
    sink: RwLock<Option<EventSink>>,
    expiry_timer: Mutex<Option<JoinHandle<()>>>,
}

impl KeycloakClient {
    /// Create a client for `realm` on the server at `url`.
    ///
    /// Sessions are persisted in `store` so a later process can resume them.
    pub fn new(url: &str, realm: &str, client_id: &str, store: Arc<dyn SecretStore>) -> Self {
        let flow = DeviceFlowClient::new(url, realm, client_id);
        let state = Arc::new(SessionState {
            issuer: flow.issuer().to_string(),
            client_id: client_id.to_string(),
            store,
            bundle: RwLock::new(None),
            sink: RwLock::new(None),
            expiry_timer: Mutex::new(None),
        });

        Self {
            flow,
            state,
            prompt: Box::new(default_prompt),
            probe_interval: DEFAULT_SESSION_PROBE_INTERVAL,
            session_probe: Mutex::new(None),
        }
    }

    /// Replace how the device code is presented to the user.
    pub fn with_prompt(
        mut self,
        prompt: impl Fn(&DeviceCodeResponse) + Send + Sync + 'static,
    ) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    /// Set the session probe period used with `check_login_iframe`.
    pub fn with_session_probe_interval(mut self, period: Duration) -> Self {
        self.probe_interval = period.max(Duration::from_millis(1));
        self
    }

    /// Realm issuer URL.
    pub fn issuer(&self) -> &str {
        &self.state.issuer
    }

    /// Expiry of the current access token.
    pub fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .current()
            .map(|bundle| bundle.tokens.access_token_expires_at)
    }

    /// Load the stored bundle, discarding unusable ones.
    fn load_stored(&self) -> Result<Option<TokenBundle>, AuthError> {
        let Some(json) = self.state.store.get(&self.state.secret_key())? else {
            return Ok(None);
        };

        let bundle = match TokenBundle::parse(&json) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(issuer = %self.state.issuer, error = %e, "discarding unreadable stored session");
                self.state.store.delete(&self.state.secret_key())?;
                return Ok(None);
            }
        };

        if bundle.is_refresh_token_expired() {
            debug!(issuer = %self.state.issuer, "stored session has expired");
            self.state.store.delete(&self.state.secret_key())?;
            return Ok(None);
        }

        Ok(Some(bundle))
    }

    /// Resume a stored session. Returns whether one was adopted.
    async fn check_sso(&self) -> Result<bool, AuthError> {
        let Some(bundle) = self.load_stored()? else {
            return Ok(false);
        };

        let bundle = if bundle.is_valid_for(RESUME_MIN_VALIDITY_SECS) {
            bundle
        } else {
            match self.refresh(&bundle).await {
                Ok(refreshed) => refreshed,
                Err(AuthError::Expired(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        };

        self.state.adopt(bundle);
        info!(issuer = %self.state.issuer, "resumed stored session");
        self.state.emit(ProviderEvent::AuthSuccess);
        Ok(true)
    }

    async fn device_login(&self) -> Result<(), AuthError> {
        let device_code = self.flow.request_device_code().await?;
        (self.prompt)(&device_code);

        let response = self.flow.poll_for_token(&device_code).await?;
        let tokens = TokenInfo::from_response(&response)?;

        self.state
            .adopt(TokenBundle::new(&self.state.issuer, &self.state.client_id, tokens));
        info!(issuer = %self.state.issuer, "login completed");
        self.state.emit(ProviderEvent::AuthSuccess);
        Ok(())
    }

    /// Exchange the bundle's refresh token and adopt nothing yet.
    ///
    /// An expired or revoked refresh token forgets the session.
    async fn refresh(&self, bundle: &TokenBundle) -> Result<TokenBundle, AuthError> {
        if bundle.is_refresh_token_expired() {
            self.state.forget()?;
            return Err(AuthError::Expired(self.state.issuer.clone()));
        }

        let mut response = match self.flow.refresh_token(&bundle.tokens.refresh_token).await {
            Ok(response) => response,
            Err(e @ AuthError::Expired(_)) => {
                self.state.forget()?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        keep_refresh_token(&mut response, bundle);
        let tokens = TokenInfo::from_response(&response)?;
        Ok(bundle.with_refreshed_tokens(tokens))
    }

    fn start_session_probe(&self) {
        let flow = self.flow.clone();
        let state = Arc::downgrade(&self.state);
        let period = self.probe_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if !probe_once(&flow, &state).await {
                    break;
                }
            }
        });

        if let Ok(mut slot) = self.session_probe.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }
}

/// One session probe round. Returns `false` once the client is gone.
async fn probe_once(flow: &DeviceFlowClient, state: &Weak<SessionState>) -> bool {
    let Some(token) = state
        .upgrade()
        .and_then(|s| s.current())
        .map(|bundle| bundle.tokens.access_token)
    else {
        return state.strong_count() > 0;
    };

    match flow.session_active(&token).await {
        Ok(true) => {}
        Ok(false) => {
            let Some(state) = state.upgrade() else {
                return false;
            };
            info!(issuer = %state.issuer, "identity provider session ended");
            if let Err(e) = state.forget() {
                warn!(error = %e, "failed to remove stored session");
            }
            state.emit(ProviderEvent::AuthLogout);
        }
        Err(e) => debug!(error = %e, "session probe failed"),
    }
    state.strong_count() > 0
}

/// Keycloak may omit the refresh token on renewal; keep the old one then.
fn keep_refresh_token(response: &mut TokenResponse, bundle: &TokenBundle) {
    if response.refresh_token.is_none() {
        response.refresh_token = Some(bundle.tokens.refresh_token.clone());
    }
}

fn default_prompt(device_code: &DeviceCodeResponse) {
    let url = device_code.browser_url();
    eprintln!("Open {} in a browser and enter code {}", url, device_code.user_code);
    if let Err(e) = open::that(url) {
        debug!(error = %e, "could not open a browser");
    }
}

/// Time until the expiry timer fires; zero when already past.
fn expiry_delay(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).to_std().unwrap_or(Duration::ZERO)
}

impl SessionState {
    fn secret_key(&self) -> String {
        TokenBundle::secret_key(&self.issuer, &self.client_id)
    }

    fn current(&self) -> Option<TokenBundle> {
        self.bundle.read().ok().and_then(|bundle| bundle.clone())
    }

    fn emit(&self, event: ProviderEvent) {
        let sink = self.sink.read().ok().and_then(|sink| sink.clone());
        match sink {
            Some(sink) => {
                if sink.send(event).is_err() {
                    debug!("event sink closed");
                }
            }
            None => debug!(?event, "no event sink registered"),
        }
    }

    /// Make `bundle` the current session, persist it and rearm the timer.
    fn adopt(self: &Arc<Self>, bundle: TokenBundle) {
        let expires_at = bundle.tokens.access_token_expires_at;

        match bundle.to_json() {
            Ok(json) => {
                if let Err(e) = self.store.set(&self.secret_key(), &json) {
                    warn!(error = %e, "session will not survive this process");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session"),
        }

        if let Ok(mut slot) = self.bundle.write() {
            *slot = Some(bundle);
        }

        self.schedule_expiry(expires_at);
    }

    fn schedule_expiry(self: &Arc<Self>, expires_at: DateTime<Utc>) {
        let delay = expiry_delay(expires_at, Utc::now());
        let state = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(state) = state.upgrade() {
                debug!(issuer = %state.issuer, "access token expired");
                state.emit(ProviderEvent::TokenExpired);
            }
        });

        self.replace_timer(Some(handle));
    }

    fn replace_timer(&self, handle: Option<JoinHandle<()>>) {
        if let Ok(mut slot) = self.expiry_timer.lock() {
            if let Some(previous) = std::mem::replace(&mut *slot, handle) {
                previous.abort();
            }
        }
    }

    /// Drop the session from memory and from the store.
    fn forget(&self) -> Result<(), AuthError> {
        if let Ok(mut slot) = self.bundle.write() {
            *slot = None;
        }
        self.replace_timer(None);
        self.store.delete(&self.secret_key())?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for KeycloakClient {
    fn register(&self, sink: EventSink) {
        if let Ok(mut slot) = self.state.sink.write() {
            *slot = Some(sink);
        }
    }

    async fn init(&self, options: InitOptions) -> Result<bool, AuthError> {
        debug!(issuer = %self.state.issuer, ?options, "initializing");

        let mut authenticated = self.check_sso().await?;

        if !authenticated && options.on_load == OnLoad::LoginRequired {
            self.login().await?;
            authenticated = self.authenticated();
        }

        if options.check_login_iframe {
            self.start_session_probe();
        }

        Ok(authenticated)
    }

    async fn login(&self) -> Result<(), AuthError> {
        match self.device_login().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(issuer = %self.state.issuer, error = %e, "login failed");
                self.state.emit(ProviderEvent::AuthError(e.to_string()));
                Err(e)
            }
        }
    }

    async fn logout(&self) -> Result<(), AuthError> {
        if let Some(bundle) = self.state.current() {
            self.flow.end_session(&bundle.tokens.refresh_token).await?;
        }

        let forgotten = self.state.forget();
        info!(issuer = %self.state.issuer, "logged out");
        self.state.emit(ProviderEvent::AuthLogout);
        forgotten
    }

    async fn update_token(&self, min_validity_secs: u64) -> Result<bool, AuthError> {
        let bundle = self
            .state
            .current()
            .ok_or_else(|| AuthError::NotAuthenticated(self.state.issuer.clone()))?;

        if bundle.is_valid_for(min_validity_secs) {
            return Ok(false);
        }

        let refreshed = self.refresh(&bundle).await?;
        self.state.adopt(refreshed);
        debug!(issuer = %self.state.issuer, "tokens refreshed");
        Ok(true)
    }

    fn authenticated(&self) -> bool {
        self.state.current().is_some()
    }

    fn token_parsed(&self) -> Option<Credential> {
        let bundle = self.state.current()?;
        match Credential::decode(&bundle.tokens.access_token) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(error = %e, "access token is not a readable JWT");
                None
            }
        }
    }

    fn name(&self) -> &str {
        "keycloak"
    }
}

impl Drop for KeycloakClient {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.session_probe.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.state.replace_timer(None);
    }
}

// Custom Debug to avoid exposing tokens
impl fmt::Debug for KeycloakClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakClient")
            .field("issuer", &self.state.issuer)
            .field("client_id", &self.state.client_id)
            .field("authenticated", &self.authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Duration as ChronoDuration;
    use tokio::sync::mpsc;

    const URL: &str = "http://127.0.0.1:9";
    const REALM: &str = "pathways";
    const CLIENT_ID: &str = "pathways-frontend";

    fn jwt(roles: &[&str]) -> String {
        let payload = serde_json::json!({
            "sub": "user-1",
            "preferred_username": "dr.ames",
            "realm_access": { "roles": roles },
        });
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn bundle(access_valid_for: i64, refresh_valid_for: Option<i64>) -> TokenBundle {
        let now = Utc::now();
        TokenBundle::new(
            &format!("{}/realms/{}", URL, REALM),
            CLIENT_ID,
            TokenInfo {
                access_token: jwt(&["practitioner"]),
                access_token_expires_at: now + ChronoDuration::seconds(access_valid_for),
                refresh_token: "refresh".into(),
                refresh_token_expires_at: refresh_valid_for
                    .map(|secs| now + ChronoDuration::seconds(secs)),
                id_token: None,
            },
        )
    }

    fn client_with(stored: Option<&TokenBundle>) -> (Arc<MemorySecretStore>, KeycloakClient) {
        let store = Arc::new(MemorySecretStore::new());
        if let Some(bundle) = stored {
            store
                .set(
                    &TokenBundle::secret_key(&bundle.issuer, &bundle.client_id),
                    &bundle.to_json().expect("serialize"),
                )
                .expect("seed store");
        }
        let client = KeycloakClient::new(URL, REALM, CLIENT_ID, store.clone());
        (store, client)
    }

    fn key() -> String {
        TokenBundle::secret_key(&format!("{}/realms/{}", URL, REALM), CLIENT_ID)
    }

    #[tokio::test]
    async fn init_without_stored_session_is_unauthenticated() {
        let (_store, client) = client_with(None);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.register(tx);

        assert!(!client.init(InitOptions::silent()).await.expect("init"));
        assert!(!client.authenticated());
        assert!(client.token_parsed().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn init_resumes_valid_stored_session() {
        let stored = bundle(3600, Some(7200));
        let (_store, client) = client_with(Some(&stored));
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.register(tx);

        assert!(client.init(InitOptions::silent()).await.expect("init"));
        assert!(client.authenticated());
        assert_eq!(rx.try_recv().ok(), Some(ProviderEvent::AuthSuccess));

        let credential = client.token_parsed().expect("credential");
        assert_eq!(credential.realm_roles(), ["practitioner"]);
        assert_eq!(credential.preferred_username.as_deref(), Some("dr.ames"));
    }

    #[tokio::test]
    async fn init_discards_expired_session() {
        let stored = bundle(-60, Some(-10));
        let (store, client) = client_with(Some(&stored));

        assert!(!client.init(InitOptions::silent()).await.expect("init"));
        assert!(store.get(&key()).expect("get").is_none());
    }

    #[tokio::test]
    async fn init_discards_unreadable_session() {
        let (store, client) = client_with(None);
        store.set(&key(), "{not json").expect("seed");

        assert!(!client.init(InitOptions::silent()).await.expect("init"));
        assert!(store.get(&key()).expect("get").is_none());
    }

    #[tokio::test]
    async fn update_token_keeps_fresh_token() {
        let stored = bundle(3600, None);
        let (_store, client) = client_with(Some(&stored));
        client.init(InitOptions::silent()).await.expect("init");

        assert!(!client.update_token(30).await.expect("update"));
        assert!(!client.update_token(30).await.expect("update again"));
    }

    #[tokio::test]
    async fn update_token_without_session_fails() {
        let (_store, client) = client_with(None);
        let err = client.update_token(30).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated(_)));
    }

    #[tokio::test]
    async fn logout_without_session_still_reports_logout() {
        let (_store, client) = client_with(None);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.register(tx);

        client.logout().await.expect("logout");
        assert_eq!(rx.try_recv().ok(), Some(ProviderEvent::AuthLogout));
        assert!(!client.authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn lapsed_access_token_emits_token_expired() {
        let (_store, client) = client_with(None);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.register(tx);

        client.state.adopt(bundle(2, Some(3600)));
        assert!(rx.try_recv().is_err());

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timer fired");
        assert_eq!(event, Some(ProviderEvent::TokenExpired));
    }

    #[test]
    fn expiry_delay_is_never_negative() {
        let now = Utc::now();
        assert_eq!(expiry_delay(now - ChronoDuration::seconds(5), now), Duration::ZERO);
        assert_eq!(
            expiry_delay(now + ChronoDuration::seconds(90), now),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn refresh_response_without_refresh_token_keeps_old_one() {
        let stored = bundle(10, None);
        let mut response = TokenResponse {
            access_token: "a.b.c".into(),
            token_type: "Bearer".into(),
            expires_in: 300,
            refresh_token: None,
            refresh_expires_in: None,
            id_token: None,
            scope: None,
        };

        keep_refresh_token(&mut response, &stored);
        assert_eq!(response.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let stored = bundle(3600, None);
        let (_store, client) = client_with(Some(&stored));
        let debug = format!("{:?}", client);
        assert!(debug.contains("KeycloakClient"));
        assert!(!debug.contains(&stored.tokens.access_token));
    }
}

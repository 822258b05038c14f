//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pathways::auth::{AuthError, Credential, EventSink, IdentityProvider, InitOptions, ProviderEvent};
use pathways::session::{Session, SessionController};
use tokio::sync::oneshot;

/// Scripted outcome of one `update_token` call.
#[derive(Debug)]
pub enum Refresh {
    /// Tokens renewed; the new credential carries these realm roles.
    Renewed(Vec<&'static str>),
    /// The token was still valid.
    StillValid,
    /// The call failed.
    Fail(AuthError),
}

/// Identity provider whose state and answers are driven by the test.
#[derive(Default)]
pub struct FakeProvider {
    sink: Mutex<Option<EventSink>>,
    credential: Mutex<Option<Credential>>,
    held_init: Mutex<Option<oneshot::Receiver<Result<bool, AuthError>>>>,
    init_error: AtomicBool,
    refreshes: Mutex<VecDeque<Refresh>>,
    login_roles: Mutex<Option<Vec<&'static str>>>,
    logout_error: AtomicBool,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl FakeProvider {
    /// Provider without a session.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Provider that already holds a credential with `roles`.
    pub fn signed_in(roles: &[&str]) -> Arc<Self> {
        let provider = Self::default();
        provider.set_roles(roles);
        Arc::new(provider)
    }

    /// Provider whose handshake only finishes when the returned sender fires.
    pub fn with_held_init() -> (Arc<Self>, oneshot::Sender<Result<bool, AuthError>>) {
        let (tx, rx) = oneshot::channel();
        let provider = Self::default();
        *provider.held_init.lock().unwrap() = Some(rx);
        (Arc::new(provider), tx)
    }

    pub fn fail_init(&self) {
        self.init_error.store(true, Ordering::SeqCst);
    }

    pub fn fail_logout(&self) {
        self.logout_error.store(true, Ordering::SeqCst);
    }

    /// Make the next `login` succeed with `roles`.
    pub fn login_succeeds_with(&self, roles: &[&'static str]) {
        *self.login_roles.lock().unwrap() = Some(roles.to_vec());
    }

    pub fn script_refresh(&self, outcome: Refresh) {
        self.refreshes.lock().unwrap().push_back(outcome);
    }

    pub fn set_roles(&self, roles: &[&str]) {
        let mut credential = Credential::with_realm_roles(roles.iter().copied());
        credential.preferred_username = Some("test.user".into());
        *self.credential.lock().unwrap() = Some(credential);
    }

    pub fn clear_credential(&self) {
        *self.credential.lock().unwrap() = None;
    }

    /// Deliver `event` as the identity provider would.
    pub fn emit(&self, event: ProviderEvent) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.send(event).expect("controller is listening");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeProvider {
    fn register(&self, sink: EventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    async fn init(&self, _options: InitOptions) -> Result<bool, AuthError> {
        let held = self.held_init.lock().unwrap().take();
        if let Some(rx) = held {
            return rx.await.unwrap_or(Ok(false));
        }
        if self.init_error.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection refused".into()));
        }
        Ok(self.authenticated())
    }

    async fn login(&self) -> Result<(), AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let roles = self.login_roles.lock().unwrap().take();
        match roles {
            Some(roles) => {
                self.set_roles(&roles);
                self.emit(ProviderEvent::AuthSuccess);
                Ok(())
            }
            None => {
                self.emit(ProviderEvent::AuthError("access_denied".into()));
                Err(AuthError::Cancelled)
            }
        }
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_error.load(Ordering::SeqCst) {
            return Err(AuthError::LogoutFailed("status 500".into()));
        }
        self.clear_credential();
        self.emit(ProviderEvent::AuthLogout);
        Ok(())
    }

    async fn update_token(&self, min_validity_secs: u64) -> Result<bool, AuthError> {
        assert_eq!(min_validity_secs, 30);
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.refreshes.lock().unwrap().pop_front();
        match outcome {
            Some(Refresh::Renewed(roles)) => {
                self.set_roles(&roles);
                Ok(true)
            }
            Some(Refresh::StillValid) | None => Ok(false),
            Some(Refresh::Fail(e)) => Err(e),
        }
    }

    fn authenticated(&self) -> bool {
        self.credential.lock().unwrap().is_some()
    }

    fn token_parsed(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Start a controller on `provider` without waiting.
pub fn start(provider: &Arc<FakeProvider>) -> Arc<SessionController> {
    let controller = SessionController::new();
    controller.start(provider.clone(), InitOptions::silent());
    controller
}

/// Start a controller on `provider` and wait for the handshake.
pub async fn start_ready(provider: &Arc<FakeProvider>) -> Arc<SessionController> {
    let controller = start(provider);
    tokio::time::timeout(Duration::from_secs(5), controller.wait_until_ready())
        .await
        .expect("handshake finished in time");
    controller
}

/// Wait until the session satisfies `check`.
pub async fn wait_for(
    controller: &SessionController,
    check: impl Fn(&Session) -> bool,
) -> Session {
    let mut rx = controller.subscribe();
    let session = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| check(s)))
        .await
        .expect("session reached the expected state in time")
        .expect("controller alive")
        .clone();
    session
}

/// Let the controller's event task drain anything already queued.
pub async fn drain() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

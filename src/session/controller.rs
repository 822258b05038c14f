//! session::controller
//!
//! The single owner of [`Session`] and the only caller of the identity
//! provider.
//!
//! # Event Handling
//!
//! Provider events and the handshake completion are consumed by one task,
//! one message at a time, so handlers never interleave. Provider events
//! that are already queued are handled before the handshake completion.
//! The completion handler recomputes authentication from the provider's
//! live state, so an `AuthSuccess` that races the handshake converges to
//! the same session whichever arrives first.
//!
//! # Publication
//!
//! Every commit replaces the whole [`Session`] inside a `watch` channel.
//! Readers see either the old or the new value, never a mix.

use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::{Readiness, Session};
use crate::auth::{AuthError, IdentityProvider, InitOptions, OnLoad, ProviderEvent};

/// Minimum remaining validity requested when a token expires.
pub const MIN_VALIDITY_SECS: u64 = 30;

/// Longest a silent handshake may take before the session becomes ready
/// without it.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(45);

/// Failures the controller absorbs.
///
/// None of these escape as panics or leave the session inconsistent;
/// commands return them so a caller can report them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionFailure {
    /// The first handshake failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// An interactive login failed.
    #[error("login failed: {0}")]
    Login(String),

    /// Logging out failed.
    #[error("logout failed: {0}")]
    Logout(String),

    /// Renewing an expired token failed.
    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// Messages consumed by the event task.
enum ControllerEvent {
    Provider(ProviderEvent),
    HandshakeCompleted(Result<bool, AuthError>),
}

/// Owner of the application session.
///
/// # Example
///
/// ```ignore
/// use pathways::auth::InitOptions;
/// use pathways::session::SessionController;
///
/// let controller = SessionController::new();
/// controller.start(provider, InitOptions::silent());
/// let session = controller.wait_until_ready().await;
/// ```
pub struct SessionController {
    provider: RwLock<Option<Arc<dyn IdentityProvider>>>,
    state: watch::Sender<Session>,
}

impl SessionController {
    /// Create a controller holding a not-started session.
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(Session::new());
        Arc::new(Self {
            provider: RwLock::new(None),
            state,
        })
    }

    /// Attach `provider` and begin the handshake.
    ///
    /// The event sink is registered before the handshake starts. Only the
    /// first call has an effect. A silent handshake that has not finished
    /// after [`HANDSHAKE_TIMEOUT`] counts as failed.
    pub fn start(self: &Arc<Self>, provider: Arc<dyn IdentityProvider>, options: InitOptions) {
        let claimed = self.state.send_if_modified(|session| {
            if session.readiness() != Readiness::NotStarted {
                return false;
            }
            *session = session.initializing();
            true
        });
        if !claimed {
            warn!("session controller already started");
            return;
        }
        debug!(reason = "handshake started", "session updated");

        let (provider_tx, provider_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        provider.register(provider_tx);
        if let Ok(mut slot) = self.provider.write() {
            *slot = Some(provider.clone());
        }

        tokio::spawn(run_events(Arc::downgrade(self), provider_rx, internal_rx));

        debug!(provider = provider.name(), ?options, "starting handshake");
        tokio::spawn(async move {
            let result = match options.on_load {
                OnLoad::CheckSso => tokio::time::timeout(HANDSHAKE_TIMEOUT, provider.init(options))
                    .await
                    .unwrap_or_else(|_| {
                        Err(AuthError::Network(format!(
                            "no answer from the identity provider within {}s",
                            HANDSHAKE_TIMEOUT.as_secs()
                        )))
                    }),
                OnLoad::LoginRequired => provider.init(options).await,
            };
            let _ = internal_tx.send(ControllerEvent::HandshakeCompleted(result));
        });
    }

    /// Current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified after every committed change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Wait until the first handshake has finished.
    pub async fn wait_until_ready(&self) -> Session {
        let mut rx = self.subscribe();
        let ready = rx.wait_for(Session::is_ready).await.map(|s| s.clone());
        ready.unwrap_or_else(|_| self.snapshot())
    }

    /// Start an interactive login.
    ///
    /// The session only changes once the provider reports success. Without
    /// a provider handle this does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionFailure::Login`] after logging it; the session is
    /// left as it was.
    pub async fn login(&self) -> Result<(), SessionFailure> {
        let Some(provider) = self.provider() else {
            debug!("login requested before a provider was attached");
            return Ok(());
        };

        provider.login().await.map_err(|e| {
            warn!(error = %e, "login failed");
            SessionFailure::Login(e.to_string())
        })
    }

    /// End the session.
    ///
    /// The provider's logout event resets the session. Without a provider
    /// handle this does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionFailure::Logout`] after logging it; the session is
    /// left as it was.
    pub async fn logout(&self) -> Result<(), SessionFailure> {
        let Some(provider) = self.provider() else {
            debug!("logout requested before a provider was attached");
            return Ok(());
        };

        provider.logout().await.map_err(|e| {
            warn!(error = %e, "logout failed");
            SessionFailure::Logout(e.to_string())
        })
    }

    fn provider(&self) -> Option<Arc<dyn IdentityProvider>> {
        self.provider.read().ok().and_then(|slot| slot.clone())
    }

    /// Replace the session with `update(current)` and notify readers if it
    /// changed.
    fn commit(&self, reason: &str, update: impl FnOnce(&Session) -> Session) {
        self.state.send_if_modified(|session| {
            let next = update(session);
            if next == *session {
                return false;
            }
            debug!(
                reason,
                readiness = ?next.readiness(),
                authenticated = next.authenticated(),
                role = %next.role(),
                "session updated"
            );
            *session = next;
            true
        });
    }

    /// Recompute authentication from the provider's live state.
    fn recompute(&self, reason: &str) {
        let Some(provider) = self.provider() else {
            self.commit(reason, Session::signed_out);
            return;
        };

        let authenticated = provider.authenticated();
        let credential = provider.token_parsed();
        self.commit(reason, |session| {
            session.with_credential(authenticated, credential.as_ref())
        });
    }

    async fn handle(&self, event: ControllerEvent) {
        match event {
            ControllerEvent::Provider(ProviderEvent::AuthSuccess) => self.on_auth_success(),
            ControllerEvent::Provider(ProviderEvent::AuthError(message)) => {
                self.on_auth_error(&message)
            }
            ControllerEvent::Provider(ProviderEvent::TokenExpired) => self.on_token_expired().await,
            ControllerEvent::Provider(ProviderEvent::AuthLogout) => self.on_auth_logout(),
            ControllerEvent::HandshakeCompleted(result) => self.on_handshake_completed(result),
        }
    }

    fn on_auth_success(&self) {
        self.recompute("auth success");
    }

    fn on_auth_error(&self, message: &str) {
        warn!(error = message, "identity provider reported an authentication error");
        self.commit("auth error", Session::signed_out);
    }

    async fn on_token_expired(&self) {
        let Some(provider) = self.provider() else {
            return;
        };

        match provider.update_token(MIN_VALIDITY_SECS).await {
            Ok(true) => self.recompute("token refreshed"),
            Ok(false) => debug!("token still valid, nothing to refresh"),
            Err(e) => {
                let failure = SessionFailure::Refresh(e.to_string());
                warn!(error = %failure, "session ended");
                self.commit("refresh failed", Session::signed_out);
            }
        }
    }

    fn on_auth_logout(&self) {
        info!("signed out");
        self.commit("logout", Session::signed_out);
    }

    fn on_handshake_completed(&self, result: Result<bool, AuthError>) {
        match &result {
            Ok(authenticated) => debug!(authenticated, "handshake completed"),
            Err(e) => {
                let failure = SessionFailure::Initialization(e.to_string());
                warn!(error = %failure, transient = e.is_transient(), "continuing without a session");
            }
        }

        let (authenticated, credential) = match self.provider() {
            Some(provider) => (provider.authenticated(), provider.token_parsed()),
            None => (false, None),
        };
        self.commit("handshake completed", |session| {
            session
                .ready()
                .with_credential(authenticated, credential.as_ref())
        });
    }
}

/// Consume provider events and the handshake completion in order.
async fn run_events(
    controller: Weak<SessionController>,
    mut provider_rx: mpsc::UnboundedReceiver<ProviderEvent>,
    mut internal_rx: mpsc::UnboundedReceiver<ControllerEvent>,
) {
    loop {
        let event = tokio::select! {
            biased;
            Some(event) = provider_rx.recv() => ControllerEvent::Provider(event),
            Some(event) = internal_rx.recv() => event,
            else => break,
        };

        let Some(controller) = controller.upgrade() else {
            break;
        };
        controller.handle(event).await;
    }
    debug!("session event stream closed");
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

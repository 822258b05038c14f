//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration into a [`Context`]
//! 2. Starts a session controller when it needs session state
//! 3. Formats and displays output
//!
//! Handlers return an [`ExitCode`] for outcomes that are not errors but
//! should still fail a script, such as a redirect to the login screen.

mod completion;
mod config_cmd;
mod navigate;
mod session_cmd;
mod shell;

pub use completion::completion;
pub use config_cmd::config;
pub use navigate::{open, routes};
pub use session_cmd::{login, logout, status};
pub use shell::shell;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::auth::{DeviceCodeResponse, InitOptions, KeycloakClient};
use crate::cli::args::Command;
use crate::config::Config;
use crate::secrets::FileSecretStore;
use crate::session::{Session, SessionController};
use crate::ui::output::{self, Verbosity};

/// Everything a command needs besides its arguments.
#[derive(Debug)]
pub struct Context {
    /// Effective configuration.
    pub config: Config,
    /// Config file that was read, if any.
    pub config_path: Option<PathBuf>,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

impl Context {
    /// Load configuration from files and the environment.
    pub fn load(verbosity: Verbosity) -> Result<Self> {
        let loaded = Config::load().context("Failed to load configuration")?;
        Ok(Self {
            config: loaded.config,
            config_path: loaded.path,
            verbosity,
        })
    }

    /// Build the Keycloak client for the configured realm.
    ///
    /// `open_browser` controls whether the login prompt tries to launch a
    /// browser.
    pub fn keycloak(&self, open_browser: bool) -> Result<Arc<KeycloakClient>> {
        let secrets_path = self
            .config
            .secrets_path()
            .context("Failed to locate the secrets file")?;

        let client = KeycloakClient::new(
            self.config.keycloak_url(),
            self.config.realm(),
            self.config.client_id(),
            Arc::new(FileSecretStore::new(secrets_path)),
        )
        .with_prompt(move |device: &DeviceCodeResponse| {
            output::always(format!(
                "To sign in, open {} and enter the code {}",
                device.browser_url(),
                device.user_code
            ));
            if open_browser {
                if let Err(e) = open::that(device.browser_url()) {
                    tracing::debug!(error = %e, "could not open a browser");
                }
            }
        });

        Ok(Arc::new(client))
    }
}

/// Start a controller for `provider` and wait for the first handshake.
pub async fn start_session(
    provider: Arc<KeycloakClient>,
    options: InitOptions,
) -> (Arc<SessionController>, Session) {
    let controller = SessionController::new();
    controller.start(provider, options);
    let session = controller.wait_until_ready().await;
    (controller, session)
}

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, verbosity: Verbosity) -> Result<ExitCode> {
    match command {
        Command::Routes => routes(),
        Command::Completion { shell } => completion(shell),
        Command::Config => config(&Context::load(verbosity)?),
        Command::Status { json } => status(&Context::load(verbosity)?, json).await,
        Command::Login { no_browser } => login(&Context::load(verbosity)?, !no_browser).await,
        Command::Logout => logout(&Context::load(verbosity)?).await,
        Command::Open { path } => open(&Context::load(verbosity)?, &path).await,
        Command::Shell { monitor } => shell(&Context::load(verbosity)?, monitor).await,
    }
}

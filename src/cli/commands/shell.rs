//! shell command - interactive session
//!
//! Reads commands from stdin while following the session. Whenever the
//! session changes (login, logout, token refresh, remote sign-out) the
//! header is printed again, the way a browser re-renders it.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use super::navigate::{navigate, print_routes};
use super::{start_session, Context};
use crate::auth::{InitOptions, OnLoad};
use crate::session::SessionController;
use crate::ui::header::Header;
use crate::ui::output;

const HELP: &str = "\
Commands:
  open <path>   show a screen
  login         sign in
  logout        sign out
  status        show the session
  routes        list screens
  help          show this help
  quit          leave the shell";

/// One line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Open(String),
    Login,
    Logout,
    Status,
    Routes,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return ShellCommand::Empty;
        };

        match (command, words.next()) {
            ("open", Some(path)) => ShellCommand::Open(path.to_string()),
            ("open", None) => ShellCommand::Unknown("open needs a path".to_string()),
            ("login", _) => ShellCommand::Login,
            ("logout", _) => ShellCommand::Logout,
            ("status", _) => ShellCommand::Status,
            ("routes", _) => ShellCommand::Routes,
            ("help" | "?", _) => ShellCommand::Help,
            ("quit" | "exit", _) => ShellCommand::Quit,
            (other, _) => ShellCommand::Unknown(format!("unknown command '{}'", other)),
        }
    }
}

/// Run the interactive shell.
///
/// With `monitor` the identity provider session is probed periodically and
/// a session ended elsewhere signs the shell out.
pub async fn shell(ctx: &Context, monitor: bool) -> Result<ExitCode> {
    let provider = ctx.keycloak(true)?;
    let options = InitOptions {
        on_load: OnLoad::CheckSso,
        check_login_iframe: monitor,
    };
    let (controller, session) = start_session(provider, options).await;

    let mut changes = controller.subscribe();
    changes.borrow_and_update();

    output::always(Header::for_session(&session));
    output::print("Type 'help' for commands.", ctx.verbosity);

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if !run_line(ctx, &controller, &line).await {
                    break;
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = changes.borrow_and_update().clone();
                output::always(Header::for_session(&session));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Execute one line. Returns `false` when the shell should exit.
async fn run_line(ctx: &Context, controller: &SessionController, line: &str) -> bool {
    match ShellCommand::parse(line) {
        ShellCommand::Open(path) => {
            let session = controller.snapshot();
            if let Err(e) = navigate(&session, &path, ctx.config.api_url(), ctx.verbosity) {
                output::error(e);
            }
        }
        ShellCommand::Login => {
            if controller.snapshot().authenticated() {
                output::print("Already signed in.", ctx.verbosity);
            } else if let Err(e) = controller.login().await {
                output::error(e);
            }
        }
        ShellCommand::Logout => {
            if let Err(e) = controller.logout().await {
                output::error(e);
            }
        }
        ShellCommand::Status => {
            let session = controller.snapshot();
            output::always(Header::for_session(&session));
            output::always(format!(
                "readiness: {:?}, authenticated: {}, role: {}",
                session.readiness(),
                session.authenticated(),
                session.role()
            ));
        }
        ShellCommand::Routes => print_routes(),
        ShellCommand::Help => output::always(HELP),
        ShellCommand::Quit => return false,
        ShellCommand::Empty => {}
        ShellCommand::Unknown(message) => output::error(format!("{}. Type 'help'.", message)),
    }
    true
}

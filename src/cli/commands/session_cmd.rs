//! session commands - status, login, logout
//!
//! # Security
//!
//! These commands NEVER print token values. Status shows only who is signed
//! in, their role, and when the access token expires.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};

use super::{start_session, Context};
use crate::auth::{IdentityProvider, InitOptions};
use crate::session::{Session, SessionController};
use crate::ui::header::Header;
use crate::ui::output::{self, format_fields};

/// How long to wait for the provider's event after a command succeeded.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Show the header and the session.
pub async fn status(ctx: &Context, json: bool) -> Result<ExitCode> {
    let provider = ctx.keycloak(false)?;
    let (_controller, session) = start_session(provider.clone(), InitOptions::silent()).await;

    if json {
        output::always(serde_json::to_string_pretty(&session).context("Failed to encode session")?);
        return Ok(ExitCode::SUCCESS);
    }

    let expires = provider
        .access_token_expires_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    output::print(Header::for_session(&session), ctx.verbosity);
    output::always(format_fields(&[
        ("readiness", format!("{:?}", session.readiness()).to_lowercase()),
        ("authenticated", session.authenticated().to_string()),
        ("role", session.role().to_string()),
        ("user", session.username().unwrap_or("-").to_string()),
        (
            "provider",
            if session.has_provider() { "attached" } else { "none" }.to_string(),
        ),
        ("issuer", provider.issuer().to_string()),
        ("token expires", expires),
    ]));

    Ok(ExitCode::SUCCESS)
}

/// Sign in with the device authorization flow.
pub async fn login(ctx: &Context, open_browser: bool) -> Result<ExitCode> {
    let provider = ctx.keycloak(open_browser)?;
    let (controller, session) = start_session(provider.clone(), InitOptions::silent()).await;

    if session.authenticated() {
        output::print(
            format!("Already signed in. {}", Header::for_session(&session)),
            ctx.verbosity,
        );
        return Ok(ExitCode::SUCCESS);
    }

    controller.login().await?;

    let session = settle(&controller, Session::authenticated).await;
    if !session.authenticated() && !provider.authenticated() {
        anyhow::bail!("login finished without a session");
    }

    output::success(
        format!("Signed in. {}", Header::for_session(&controller.snapshot())),
        ctx.verbosity,
    );
    Ok(ExitCode::SUCCESS)
}

/// Sign out at the identity provider and forget the stored session.
pub async fn logout(ctx: &Context) -> Result<ExitCode> {
    let provider = ctx.keycloak(false)?;
    let (controller, session) = start_session(provider, InitOptions::silent()).await;

    controller.logout().await?;

    if session.authenticated() {
        settle(&controller, |s| !s.authenticated()).await;
        output::success("Signed out.", ctx.verbosity);
    } else {
        output::print("Not signed in.", ctx.verbosity);
    }
    Ok(ExitCode::SUCCESS)
}

/// Wait briefly for the session to satisfy `done`, returning the latest
/// snapshot either way.
async fn settle(controller: &SessionController, done: impl Fn(&Session) -> bool) -> Session {
    let mut rx = controller.subscribe();
    let reached = tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(|s| done(s)))
        .await
        .is_ok_and(|changed| changed.is_ok());
    if !reached {
        tracing::debug!("session did not settle in time");
    }
    controller.snapshot()
}

//! navigation commands - open a screen, list screens

use std::process::ExitCode;

use anyhow::{bail, Result};

use super::{start_session, Context};
use crate::auth::InitOptions;
use crate::gate::{GateDecision, Route, LOGIN_PATH, ROUTES};
use crate::session::Session;
use crate::ui::header::Header;
use crate::ui::output::{self, Verbosity};
use crate::ui::pages;

/// Open a screen.
///
/// Prints the page when the gate allows it. A redirect prints the login
/// screen instead and exits with a failure status.
pub async fn open(ctx: &Context, path: &str) -> Result<ExitCode> {
    let provider = ctx.keycloak(false)?;
    let (_controller, session) = start_session(provider, InitOptions::silent()).await;

    output::print(Header::for_session(&session), ctx.verbosity);
    let allowed = navigate(&session, path, ctx.config.api_url(), ctx.verbosity)?;

    Ok(if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Gate `path` for `session` and render the resulting screen.
///
/// Returns whether the requested screen was shown.
pub(crate) fn navigate(
    session: &Session,
    path: &str,
    api_url: &str,
    verbosity: Verbosity,
) -> Result<bool> {
    let Some(route) = Route::resolve(path) else {
        bail!("no screen at '{}'. Run 'pathways routes' to list screens.", path);
    };

    match route.decide(session) {
        GateDecision::Allow => {
            output::always(pages::render(route.page, session, api_url));
            Ok(true)
        }
        GateDecision::Redirect { target } => {
            let required = route
                .requirement
                .map(|r| r.to_string())
                .unwrap_or_default();
            output::warn(
                format!("{} requires {}; redirected to {}", route.path, required, target),
                verbosity,
            );
            if let Some(login) = Route::resolve(target) {
                output::print(pages::render(login.page, session, api_url), verbosity);
            }
            Ok(false)
        }
        GateDecision::Pending => bail!("session is still initializing"),
    }
}

/// List screens and the roles they require.
pub fn routes() -> Result<ExitCode> {
    print_routes();
    Ok(ExitCode::SUCCESS)
}

/// Print the route table.
pub(crate) fn print_routes() {
    for line in route_lines() {
        output::always(line);
    }
}

/// One aligned `path  access` line per route.
fn route_lines() -> Vec<String> {
    let width = ROUTES.iter().map(|r| r.path.len()).max().unwrap_or(0);
    ROUTES
        .iter()
        .map(|route| {
            let access = match &route.requirement {
                Some(requirement) => requirement.to_string(),
                None if route.path == LOGIN_PATH => "public (sign-in)".to_string(),
                None => "public".to_string(),
            };
            format!("{:width$}  {}", route.path, access, width = width)
        })
        .collect()
}

//! config command - Show the effective configuration

use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::Context;
use crate::ui::output::{self, format_fields};

/// Print the effective configuration.
///
/// The secrets file is shown by path only; its contents are never read.
pub fn config(ctx: &Context) -> Result<ExitCode> {
    let config = &ctx.config;
    let secrets = config
        .secrets_path()
        .context("Failed to locate the secrets file")?;

    let source = ctx
        .config_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    output::always(format_fields(&[
        ("config file", source),
        ("api url", config.api_url().to_string()),
        ("keycloak url", config.keycloak_url().to_string()),
        ("realm", config.realm().to_string()),
        ("client id", config.client_id().to_string()),
        ("secrets file", secrets.display().to_string()),
    ]));

    Ok(ExitCode::SUCCESS)
}

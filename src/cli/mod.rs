//! cli
//!
//! Command-line presentation shell for Pathways.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the diagnostics subscriber
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Commands read [`Session`](crate::session::Session)
//! snapshots and send login/logout requests through the
//! [`SessionController`](crate::session::SessionController); they never call
//! the identity provider themselves.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    commands::dispatch(cli.command, verbosity).await
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` decides the filter unless `--debug` is given; without either
/// only warnings and errors are shown.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

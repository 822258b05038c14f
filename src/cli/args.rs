//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};

/// Pathways - session and access control for Pathways Clinical Chat
#[derive(Parser, Debug)]
#[command(name = "pathways")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the header and the current session
    #[command(
        long_about = "Show the header and the current session.\n\n\
            Resumes a stored session silently; never starts a login."
    )]
    Status {
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with the device authorization flow
    #[command(
        after_help = "\
EXAMPLES:
    # Sign in, opening the verification page in a browser
    pathways login

    # Print the verification URL and code only
    pathways login --no-browser"
    )]
    Login {
        /// Do not try to open a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Open a screen, subject to role gating
    #[command(
        after_help = "\
Exits with a non-zero status when the screen redirects to the login page.

EXAMPLES:
    pathways open /
    pathways open /practitioner"
    )]
    Open {
        /// Route path, e.g. /hr
        path: String,
    },

    /// List screens and the roles they require
    Routes,

    /// Show the effective configuration
    Config,

    /// Interactive session that follows session changes
    Shell {
        /// Watch the identity provider session and sign out when it ends
        #[arg(long)]
        monitor: bool,
    },

    /// Generate shell completion scripts
    #[command(
        after_help = "\
EXAMPLES:
    # Bash
    pathways completion bash > ~/.local/share/bash-completion/completions/pathways

    # Zsh
    pathways completion zsh > ~/.zfunc/_pathways

    # Fish
    pathways completion fish > ~/.config/fish/completions/pathways.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `completion`.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

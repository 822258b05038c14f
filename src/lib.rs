//! Pathways - session and access-control client for Pathways Clinical Chat
//!
//! Pathways owns the lifecycle of an identity-provider session for a single
//! running client: it reacts to asynchronous authentication events, refreshes
//! expiring credentials, derives a coarse role from the credential and uses
//! that role to gate which screens a caller may reach.
//!
//! # Architecture
//!
//! The codebase is layered leaf-first:
//!
//! - [`secrets`] - Secret storage used internally by the identity provider
//! - [`auth`] - Identity provider boundary and the Keycloak adapter
//! - [`session`] - The session controller (authoritative session state)
//! - [`gate`] - Role gating for routed screens
//! - [`config`] - Configuration schema and loading
//! - [`ui`] - Textual presentation (header, pages, output)
//! - [`cli`] - Command-line shell (parses args, drives the controller)
//!
//! # Correctness Invariants
//!
//! 1. A role other than `public` is only ever held by an authenticated session
//! 2. The session is written only by the session controller
//! 3. Provider failures never escape the controller; they become session
//!    transitions
//! 4. The gate never redirects before the initial handshake has settled

pub mod auth;
pub mod cli;
pub mod config;
pub mod gate;
pub mod secrets;
pub mod session;
pub mod ui;

//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`header`] - The header bar with the login/logout button
//! - [`pages`] - Text rendering of routed screens
//!
//! # Design
//!
//! Presentation only reads [`Session`](crate::session::Session) snapshots.
//! Login and logout requests go back through the session controller; nothing
//! here talks to the identity provider.

pub mod header;
pub mod output;
pub mod pages;
